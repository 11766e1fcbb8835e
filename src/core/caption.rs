use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{
    domain::CaptionVerdict,
    infrastructure::external::{CaptionAttemptError, Captioner},
};

/// Politique de réessai du service de légende, sans jitter
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// Validation de la pertinence d'une image via sa légende.
/// Toute indisponibilité du service laisse passer la requête.
#[derive(Clone)]
pub struct CaptionValidator {
    captioner: Option<Arc<dyn Captioner>>,
    policy: RetryPolicy,
}

impl CaptionValidator {
    pub fn new(captioner: Option<Arc<dyn Captioner>>, policy: RetryPolicy) -> Self {
        Self { captioner, policy }
    }

    /// Validateur sans service configuré: toujours `Inconclusive`
    pub fn disabled() -> Self {
        Self::new(None, RetryPolicy::default())
    }

    pub async fn validate(&self, image: &[u8]) -> CaptionVerdict {
        let Some(captioner) = &self.captioner else {
            debug!("Service de légende non configuré, étape ignorée");
            return CaptionVerdict::Inconclusive("caption service not configured".to_string());
        };

        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = CaptionAttemptError::RateLimited;

        for attempt in 1..=max_attempts {
            match captioner.caption(image).await {
                Ok(caption) => {
                    info!(attempt, caption = %caption, "📝 Légende obtenue");
                    return CaptionVerdict::from_caption(caption);
                }
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "⚠️ Échec de l'appel de légende");
                    let rate_limited = e == CaptionAttemptError::RateLimited;
                    last_error = e;
                    // pas d'attente après la dernière tentative
                    if rate_limited && attempt < max_attempts {
                        tokio::time::sleep(self.policy.delay).await;
                    }
                }
            }
        }

        CaptionVerdict::Inconclusive(last_error.to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedCaptioner;
    use super::*;
    use tokio::time::Instant;

    fn validator(captioner: Arc<ScriptedCaptioner>) -> CaptionValidator {
        CaptionValidator::new(Some(captioner as Arc<dyn Captioner>), RetryPolicy::default())
    }

    #[tokio::test]
    async fn test_jewelry_and_non_jewelry_captions() {
        let verdict = validator(ScriptedCaptioner::always("a gold ring on a table"))
            .validate(b"img")
            .await;
        assert_eq!(verdict, CaptionVerdict::Jewelry("a gold ring on a table".into()));

        let verdict = validator(ScriptedCaptioner::always("a cat on a sofa"))
            .validate(b"img")
            .await;
        assert_eq!(verdict, CaptionVerdict::NotJewelry("a cat on a sofa".into()));
    }

    #[tokio::test]
    async fn test_disabled_is_inconclusive() {
        let verdict = CaptionValidator::disabled().validate(b"img").await;
        assert!(matches!(verdict, CaptionVerdict::Inconclusive(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_sleeps_between_attempts_only() {
        let captioner = ScriptedCaptioner::new(vec![Err(CaptionAttemptError::RateLimited)]);
        let start = Instant::now();

        let verdict = validator(captioner.clone()).validate(b"img").await;

        assert_eq!(verdict, CaptionVerdict::Inconclusive("rate limit exceeded".into()));
        assert_eq!(captioner.call_count(), 3);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(10) && elapsed < Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_failures_retry_without_sleep() {
        let captioner = ScriptedCaptioner::new(vec![
            Err(CaptionAttemptError::Status(502)),
            Err(CaptionAttemptError::Transport("reset".into())),
            Ok("silver necklace".into()),
        ]);
        let start = Instant::now();

        let verdict = validator(captioner.clone()).validate(b"img").await;

        assert_eq!(verdict, CaptionVerdict::Jewelry("silver necklace".into()));
        assert_eq!(captioner.call_count(), 3);
        assert!(start.elapsed() < Duration::from_millis(1));
    }
}
