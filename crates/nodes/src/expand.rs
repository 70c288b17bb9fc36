//! Environment-variable expansion of resource names.

use std::borrow::Cow;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use pipeline::{Next, Node, Request, ResourceError, ResourceName, Response};
use regex::{Captures, Regex};
use tracing::debug;

/// `%NAME%` (Windows style) or `${NAME}` (shell style).
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%([A-Za-z_][A-Za-z0-9_()]*)%|\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .expect("Valid placeholder pattern")
});

type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Rewrites the resource name by substituting environment placeholders.
///
/// Unknown variables are left verbatim. When the name changes, the expanded
/// name is pushed onto the request's name stack; otherwise the request passes
/// through untouched.
#[derive(Clone)]
pub struct ExpandEnvironmentVariables {
    lookup: Lookup,
}

impl ExpandEnvironmentVariables {
    /// Expands from the process environment.
    pub fn new() -> Self {
        Self::with_lookup(|key| std::env::var(key).ok())
    }

    /// Expands from a custom variable source.
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Arc::new(lookup),
        }
    }

    /// Returns `input` with every known placeholder replaced.
    pub fn expand<'a>(&self, input: &'a str) -> Cow<'a, str> {
        PLACEHOLDER.replace_all(input, |caps: &Captures<'_>| {
            let key = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());
            (self.lookup)(key).unwrap_or_else(|| caps[0].to_owned())
        })
    }
}

impl Default for ExpandEnvironmentVariables {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for ExpandEnvironmentVariables {
    fn name(&self) -> &'static str {
        "expand_environment_variables"
    }

    async fn invoke(&self, mut request: Request, next: Next<'_>) -> Result<Response, ResourceError> {
        let current = request.resource().as_str();
        let expanded = self.expand(current);
        if expanded != current {
            if let Some(name) = ResourceName::new(expanded.into_owned()) {
                debug!(from = %request.resource(), to = %name, "expanded resource name");
                request.name.push(name);
            }
        }
        next.run(request).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pipeline::Terminal;

    use super::*;

    fn node() -> ExpandEnvironmentVariables {
        let vars = HashMap::from([
            ("TEMP".to_string(), "/tmp".to_string()),
            ("HOME".to_string(), "/home/app".to_string()),
        ]);
        ExpandEnvironmentVariables::with_lookup(move |k| vars.get(k).cloned())
    }

    #[test]
    fn test_expand_both_styles() {
        let n = node();
        assert_eq!(n.expand("%TEMP%/a.txt"), "/tmp/a.txt");
        assert_eq!(n.expand("file:${HOME}/.config"), "file:/home/app/.config");
        assert_eq!(n.expand("%TEMP%/%HOME%"), "/tmp//home/app");
    }

    #[test]
    fn test_unknown_and_plain_names_are_unchanged() {
        let n = node();
        assert_eq!(n.expand("%NOPE%/a"), "%NOPE%/a");
        assert!(matches!(n.expand("mem:plain"), Cow::Borrowed("mem:plain")));
        assert_eq!(n.expand("50% off"), "50% off");
    }

    struct Echo;

    #[async_trait]
    impl Terminal for Echo {
        async fn dispatch(&self, request: Request) -> Result<Response, ResourceError> {
            let seen = request.resource().to_string();
            let depth = request.name.history().len();
            Ok(Response::success(&request, format!("{seen}|{depth}")))
        }
    }

    async fn run(name: &str) -> String {
        let node = node();
        let request = Request::read(ResourceName::new(name).unwrap());
        let response = node.invoke(request, Next::new(&[], &Echo)).await.unwrap();
        response.body.to_text(Default::default()).unwrap()
    }

    #[tokio::test]
    async fn test_controller_sees_expanded_name() {
        assert_eq!(run("%TEMP%/a.txt").await, "/tmp/a.txt|2");
    }

    #[tokio::test]
    async fn test_unchanged_name_is_not_pushed() {
        assert_eq!(run("mem:x").await, "mem:x|1");
    }
}
