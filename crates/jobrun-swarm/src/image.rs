//! Image reference handling for pulls.

/// Tag used when a reference carries none.
const DEFAULT_TAG: &str = "latest";

/// What to pull: `repository:tag`, optionally from a private registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullOptions {
    /// Repository, prefixed with the registry host when one is given.
    pub repository: String,
    pub tag: String,
    /// Registry host, used to scope the pull credentials.
    pub registry: Option<String>,
}

impl PullOptions {
    /// Build pull options for `image`, optionally hosted on `registry`.
    ///
    /// Without an explicit registry, one is inferred from the repository's
    /// first path segment when it looks like a host.
    pub fn parse(image: &str, registry: Option<&str>) -> Self {
        let (repository, tag) = split_repository_tag(image);
        let tag = tag.unwrap_or(DEFAULT_TAG).to_string();

        match registry.filter(|r| !r.is_empty()) {
            Some(registry) => Self {
                repository: format!("{}/{}", registry, repository),
                tag,
                registry: Some(registry.to_string()),
            },
            None => Self {
                registry: infer_registry(repository),
                repository: repository.to_string(),
                tag,
            },
        }
    }

    /// `repository:tag`.
    pub fn reference(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }
}

/// Image name as the cluster should resolve it.
pub fn full_image_name(registry: Option<&str>, image: &str) -> String {
    match registry.filter(|r| !r.is_empty()) {
        Some(registry) => format!("{}/{}", registry, image),
        None => image.to_string(),
    }
}

/// Split `repo[:tag]`. A `:` followed by a `/` belongs to a registry port.
fn split_repository_tag(image: &str) -> (&str, Option<&str>) {
    match image.rsplit_once(':') {
        Some((repository, tag)) if !tag.contains('/') && !tag.is_empty() => {
            (repository, Some(tag))
        }
        _ => (image, None),
    }
}

fn infer_registry(repository: &str) -> Option<String> {
    let parts: Vec<&str> = repository.split('/').collect();
    if parts.len() < 2 {
        return None;
    }

    let host = parts[0];
    if host.contains('.') || host.contains(':') || parts.len() > 2 {
        return Some(host.to_string());
    }

    None
}
