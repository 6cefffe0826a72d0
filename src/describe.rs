//! Descriptive Text
//!
//! Client for the service that writes a short, child-friendly blurb about a
//! model. The service itself is external; this module only knows its request
//! and reply shapes, and always has a fallback record ready so the viewer
//! never sees an error from it.

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::settings::DescribeSettings;
use crate::utils::BoxFuture;

/// Structured narrative text for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    pub name: String,
    pub description: String,
    pub fun_fact: String,
    /// Onomatopoeic sound label, e.g. "Quack!".
    pub sound: String,
}

impl Default for Description {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: "A wonderful thing to look at from every side!".to_string(),
            fun_fact: "You can spin it around to see what it looks like underneath.".to_string(),
            sound: "Wow!".to_string(),
        }
    }
}

impl Description {
    /// Rejects replies with any empty field.
    fn is_complete(&self) -> bool {
        [&self.name, &self.description, &self.fun_fact, &self.sound]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

/// Source of descriptive text.
pub trait Describer: Send + Sync {
    fn describe<'a>(&'a self, subject: &'a str) -> BoxFuture<'a, Result<Description>>;
}

#[derive(Serialize)]
struct DescribeRequest<'a> {
    subject: &'a str,
}

/// Posts `{"subject": …}` as JSON and parses a [`Description`] from the reply.
pub struct HttpDescriber {
    endpoint: String,
    headers: Vec<(String, String)>,
}

impl HttpDescriber {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    /// `None` when no endpoint is configured.
    #[must_use]
    pub fn from_settings(settings: &DescribeSettings) -> Option<Self> {
        settings.endpoint.as_deref().map(Self::new)
    }
}

impl Describer for HttpDescriber {
    fn describe<'a>(&'a self, subject: &'a str) -> BoxFuture<'a, Result<Description>> {
        Box::pin(async move {
            let body = serde_json::to_vec(&DescribeRequest { subject })?;
            let mut request = ehttp::Request::post(&self.endpoint, body);
            request.headers.insert("Content-Type", "application/json");
            for (key, value) in &self.headers {
                request.headers.insert(key, value);
            }

            let response = ehttp::fetch_async(request)
                .await
                .map_err(Error::Describe)?;
            if !response.ok {
                return Err(Error::Describe(format!(
                    "status {} {}",
                    response.status, response.status_text
                )));
            }
            Ok(serde_json::from_slice(&response.bytes)?)
        })
    }
}

/// Asks `describer` about `subject`, substituting `fallback` on any failure
/// or incomplete reply. The fallback's `name` is set to the subject.
pub async fn describe_or_fallback(
    describer: Option<&dyn Describer>,
    subject: &str,
    fallback: &Description,
) -> Description {
    let substitute = || Description {
        name: subject.to_string(),
        ..fallback.clone()
    };

    let Some(describer) = describer else {
        return substitute();
    };

    match describer.describe(subject).await {
        Ok(description) if description.is_complete() => description,
        Ok(_) => {
            log::warn!("Incomplete description for '{subject}', using fallback");
            substitute()
        }
        Err(e) => {
            log::warn!("Description request for '{subject}' failed: {e}; using fallback");
            substitute()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    struct Canned(Result<Description>);

    impl Describer for Canned {
        fn describe<'a>(&'a self, _subject: &'a str) -> BoxFuture<'a, Result<Description>> {
            let reply = match &self.0 {
                Ok(d) => Ok(d.clone()),
                Err(e) => Err(Error::Describe(e.to_string())),
            };
            Box::pin(async move { reply })
        }
    }

    fn duck() -> Description {
        Description {
            name: "Duck".into(),
            description: "A rubber duck.".into(),
            fun_fact: "Ducks have waterproof feathers.".into(),
            sound: "Quack!".into(),
        }
    }

    #[test]
    fn reply_is_used_when_complete() {
        let describer = Canned(Ok(duck()));
        let got = block_on(describe_or_fallback(Some(&describer), "Duck", &Description::default()));
        assert_eq!(got, duck());
    }

    #[test]
    fn failure_yields_named_fallback() {
        let describer = Canned(Err(Error::Describe("status 500".into())));
        let fallback = Description::default();
        let got = block_on(describe_or_fallback(Some(&describer), "Robot", &fallback));
        assert_eq!(got.name, "Robot");
        assert_eq!(got.sound, fallback.sound);
    }

    #[test]
    fn incomplete_reply_yields_fallback() {
        let describer = Canned(Ok(Description {
            fun_fact: "  ".into(),
            ..duck()
        }));
        let got = block_on(describe_or_fallback(Some(&describer), "Duck", &Description::default()));
        assert_eq!(got.fun_fact, Description::default().fun_fact);
    }

    #[test]
    fn missing_service_yields_fallback() {
        let got = block_on(describe_or_fallback(None, "Cat", &Description::default()));
        assert_eq!(got.name, "Cat");
    }

    #[test]
    fn reply_json_shape() {
        let json = r#"{"name":"Duck","description":"d","fun_fact":"f","sound":"Quack!"}"#;
        let parsed: Description = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.sound, "Quack!");
    }
}
