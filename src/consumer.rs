//! NATS request consumer for prediction and health subjects

use crate::config::NatsConfig;
use crate::types::Target;
use anyhow::Result;
use async_nats::{Client, Message};
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use tracing::info;

/// What an incoming message asks for, derived from its subject
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Predict(Target),
    Health,
}

/// Consumer for prediction requests arriving over NATS
pub struct RequestConsumer {
    client: Client,
    subjects: Vec<(String, Route)>,
    queue_group: String,
}

impl RequestConsumer {
    /// Create a new request consumer
    pub fn new(client: Client, config: &NatsConfig) -> Self {
        Self {
            client,
            subjects: routes(config),
            queue_group: config.queue_group.clone(),
        }
    }

    /// Subscribe to every subject, merged into one stream tagged by route
    pub async fn subscribe(&self) -> Result<BoxStream<'static, (Route, Message)>> {
        let mut streams = Vec::with_capacity(self.subjects.len());

        for (subject, route) in &self.subjects {
            let subscriber = self
                .client
                .queue_subscribe(subject.clone(), self.queue_group.clone())
                .await?;
            info!(subject = %subject, queue_group = %self.queue_group, route = ?route, "Subscribed");

            let route = *route;
            streams.push(subscriber.map(move |message| (route, message)).boxed());
        }

        Ok(stream::select_all(streams).boxed())
    }

    /// Subjects this consumer listens on
    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.subjects.iter().map(|(s, _)| s.as_str())
    }
}

/// Map configured subjects to routes
pub fn routes(config: &NatsConfig) -> Vec<(String, Route)> {
    vec![
        (config.gpa_subject.clone(), Route::Predict(Target::Gpa)),
        (
            config.grade_class_subject.clone(),
            Route::Predict(Target::GradeClass),
        ),
        (config.health_subject.clone(), Route::Health),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_routes_from_config() {
        let config = AppConfig::default();
        let routes = routes(&config.nats);

        assert_eq!(
            routes,
            vec![
                ("predict.gpa".to_string(), Route::Predict(Target::Gpa)),
                (
                    "predict.gradeclass".to_string(),
                    Route::Predict(Target::GradeClass)
                ),
                ("predict.health".to_string(), Route::Health),
            ]
        );
    }

    // Subscription tests would require a running NATS server
}
