use super::models::{RecommendationRequest, Track};
use super::range::ExpansionPolicy;
use super::{RecommendationError, RecommendationSource};
use crate::features::AudioFeatureVector;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Matched { tracks: Vec<Track>, attempts: u32 },
    /// Every attempt came back empty.
    Exhausted { attempts: u32 },
}

/// Queries a [`RecommendationSource`] around a point target, widening the
/// windows after every empty answer.
pub struct RangeExpansionQuery {
    source: Arc<dyn RecommendationSource>,
    policy: ExpansionPolicy,
    limit: u32,
}

impl RangeExpansionQuery {
    pub fn new(source: Arc<dyn RecommendationSource>, policy: ExpansionPolicy, limit: u32) -> Self {
        Self {
            source,
            policy,
            limit,
        }
    }

    pub fn policy(&self) -> &ExpansionPolicy {
        &self.policy
    }

    /// Run attempts sequentially until one returns tracks or the policy
    /// runs out. Source errors end the run immediately.
    pub async fn run(
        &self,
        target: &AudioFeatureVector,
        seed_genre: &str,
    ) -> Result<QueryOutcome, RecommendationError> {
        let mut attempt = 1;
        loop {
            let request = RecommendationRequest {
                limit: self.limit,
                seed_genres: vec![seed_genre.to_string()],
                target: *target,
                windows: self.policy.windows_for_attempt(target, attempt),
            };
            debug!(attempt, seed_genre, "Querying recommendations");

            let tracks = self.source.recommend(&request).await?;
            if !tracks.is_empty() {
                info!(attempt, count = tracks.len(), "Found recommendations");
                return Ok(QueryOutcome::Matched {
                    tracks,
                    attempts: attempt,
                });
            }

            if !self.policy.should_retry(attempt) {
                warn!(attempts = attempt, "No tracks found after maximum attempts");
                return Ok(QueryOutcome::Exhausted { attempts: attempt });
            }
            warn!(attempt, "No tracks found, expanding the range");
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::AudioFeature;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn target() -> AudioFeatureVector {
        AudioFeatureVector([0.5, 0.5, 0.5, 0.5, 5.0, 0.5, -30.0, 1.0, 0.5, 150.0, 4.0, 0.5])
    }

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            name: format!("Track {}", id),
            artists: vec!["Artist".to_string()],
            preview_url: None,
            external_url: None,
        }
    }

    /// Answers empty until `match_on`, recording every request.
    struct ScriptedSource {
        match_on: Option<usize>,
        fail_on: Option<usize>,
        requests: Mutex<Vec<RecommendationRequest>>,
    }

    impl ScriptedSource {
        fn new(match_on: Option<usize>, fail_on: Option<usize>) -> Arc<Self> {
            Arc::new(Self {
                match_on,
                fail_on,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<RecommendationRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RecommendationSource for ScriptedSource {
        async fn recommend(
            &self,
            request: &RecommendationRequest,
        ) -> Result<Vec<Track>, RecommendationError> {
            let n = {
                let mut requests = self.requests.lock().unwrap();
                requests.push(request.clone());
                requests.len()
            };
            if self.fail_on == Some(n) {
                return Err(RecommendationError::Api {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            if self.match_on == Some(n) {
                return Ok(vec![track("a"), track("b")]);
            }
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_first_attempt_match() {
        let source = ScriptedSource::new(Some(1), None);
        let query = RangeExpansionQuery::new(source.clone(), ExpansionPolicy::default(), 10);

        let outcome = query.run(&target(), "pop").await.unwrap();
        match outcome {
            QueryOutcome::Matched { tracks, attempts } => {
                assert_eq!(attempts, 1);
                assert_eq!(tracks.len(), 2);
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        let requests = source.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].limit, 10);
        assert_eq!(requests[0].seed_genres, vec!["pop".to_string()]);
        assert_eq!(requests[0].target, target());
    }

    #[tokio::test]
    async fn test_match_after_expansion() {
        let source = ScriptedSource::new(Some(3), None);
        let query = RangeExpansionQuery::new(source.clone(), ExpansionPolicy::default(), 1);

        let outcome = query.run(&target(), "pop").await.unwrap();
        assert!(matches!(outcome, QueryOutcome::Matched { attempts: 3, .. }));

        let requests = source.requests();
        assert_eq!(requests.len(), 3);
        let widths: Vec<f64> = requests
            .iter()
            .map(|r| r.windows.get(AudioFeature::Tempo).width())
            .collect();
        assert!(widths[0] < widths[1] && widths[1] < widths[2]);
    }

    #[tokio::test]
    async fn test_exhausts_after_max_attempts() {
        let source = ScriptedSource::new(None, None);
        let policy = ExpansionPolicy {
            max_attempts: 4,
            ..ExpansionPolicy::default()
        };
        let query = RangeExpansionQuery::new(source.clone(), policy, 1);

        let outcome = query.run(&target(), "pop").await.unwrap();
        assert_eq!(outcome, QueryOutcome::Exhausted { attempts: 4 });
        assert_eq!(source.requests().len(), 4);
    }

    #[tokio::test]
    async fn test_source_error_is_not_retried() {
        let source = ScriptedSource::new(None, Some(2));
        let query = RangeExpansionQuery::new(source.clone(), ExpansionPolicy::default(), 1);

        let err = query.run(&target(), "pop").await.unwrap_err();
        assert!(matches!(err, RecommendationError::Api { status: 500, .. }));
        assert_eq!(source.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_single_attempt_policy() {
        let source = ScriptedSource::new(None, None);
        let policy = ExpansionPolicy {
            max_attempts: 1,
            ..ExpansionPolicy::default()
        };
        let query = RangeExpansionQuery::new(source.clone(), policy, 1);
        let outcome = query.run(&target(), "jazz").await.unwrap();
        assert_eq!(outcome, QueryOutcome::Exhausted { attempts: 1 });
    }

    #[cfg(feature = "mock")]
    #[tokio::test]
    async fn test_widens_until_mocked_source_answers() {
        let mut source = crate::recommend::MockRecommendationSource::new();
        let mut calls = 0;
        source
            .expect_recommend()
            .withf(|request| request.seed_genres == vec!["rock".to_string()])
            .times(2)
            .returning(move |_| {
                calls += 1;
                if calls == 1 {
                    Ok(vec![])
                } else {
                    Ok(vec![track("late")])
                }
            });
        let query = RangeExpansionQuery::new(Arc::new(source), ExpansionPolicy::default(), 5);

        let outcome = query.run(&target(), "rock").await.unwrap();
        match outcome {
            QueryOutcome::Matched { tracks, attempts } => {
                assert_eq!(attempts, 2);
                assert_eq!(tracks[0].id, "late");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
