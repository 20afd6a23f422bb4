//! Endpoint test suite: a batch of questions with a latency summary.

use adapter::{MessageSender, NormalizedResult, RESPONSE_TIME_TARGET};
use std::time::Duration;

pub const DEFAULT_QUESTIONS: [&str; 5] = [
    "What programs does the university offer?",
    "Tell me about the co-op program.",
    "What are the admission requirements?",
    "Where is the university located?",
    "What is the student-faculty ratio?",
];

/// One question and what came back for it.
#[derive(Debug, Clone)]
pub struct SuiteOutcome {
    pub question: String,
    pub result: NormalizedResult,
}

/// Aggregate of a suite run.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteSummary {
    pub total: usize,
    pub succeeded: usize,
    /// Mean latency over successful questions.
    pub average: Option<Duration>,
}

impl SuiteSummary {
    pub fn from_outcomes(outcomes: &[SuiteOutcome]) -> Self {
        let ok: Vec<u64> = outcomes
            .iter()
            .filter(|o| o.result.ok)
            .map(|o| o.result.elapsed_ms)
            .collect();
        let average = (!ok.is_empty())
            .then(|| Duration::from_millis(ok.iter().sum::<u64>() / ok.len() as u64));
        Self {
            total: outcomes.len(),
            succeeded: ok.len(),
            average,
        }
    }

    pub fn failed(&self) -> usize {
        self.total - self.succeeded
    }

    pub fn meets_target(&self) -> bool {
        self.average.is_some_and(|avg| avg < RESPONSE_TIME_TARGET)
    }
}

/// Ask each question in turn, pausing `delay` between requests.
pub async fn run<S: MessageSender>(
    sender: &S,
    questions: &[String],
    delay: Duration,
    mut on_outcome: impl FnMut(usize, &SuiteOutcome),
) -> Vec<SuiteOutcome> {
    let mut outcomes = Vec::with_capacity(questions.len());
    for (i, question) in questions.iter().enumerate() {
        let Some(result) = sender.send(question).await else {
            continue;
        };
        let outcome = SuiteOutcome {
            question: question.clone(),
            result,
        };
        on_outcome(i, &outcome);
        outcomes.push(outcome);

        if i + 1 < questions.len() && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every other message with a failure.
    struct Alternating {
        calls: AtomicUsize,
    }

    impl MessageSender for Alternating {
        async fn send(&self, message: &str) -> Option<NormalizedResult> {
            if message.trim().is_empty() {
                return None;
            }
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Some(NormalizedResult {
                answer: format!("answer to {message}"),
                sources: Vec::new(),
                confidence: if n % 2 == 0 { "high" } else { "low" }.to_string(),
                timing: Default::default(),
                documents_searched: 0,
                elapsed_ms: 1000 * (n as u64 + 1),
                ok: n % 2 == 0,
                error_kind: None,
            })
        }
    }

    fn questions(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn runs_every_non_empty_question() {
        let sender = Alternating {
            calls: AtomicUsize::new(0),
        };
        let mut seen = Vec::new();
        let outcomes = run(
            &sender,
            &questions(&["a", "  ", "b", "c"]),
            Duration::ZERO,
            |i, _| seen.push(i),
        )
        .await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(seen, vec![0, 2, 3]);
        assert_eq!(sender.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn summary_averages_successes_only() {
        let sender = Alternating {
            calls: AtomicUsize::new(0),
        };
        let outcomes = run(&sender, &questions(&["a", "b", "c"]), Duration::ZERO, |_, _| {}).await;
        let summary = SuiteSummary::from_outcomes(&outcomes);

        // successes took 1s and 3s
        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.average, Some(Duration::from_secs(2)));
        assert!(summary.meets_target());
    }

    #[test]
    fn empty_summary_misses_target() {
        let summary = SuiteSummary::from_outcomes(&[]);
        assert_eq!(summary.average, None);
        assert!(!summary.meets_target());
    }
}
