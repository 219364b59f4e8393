use crate::models::Template;

/// Query parameter carrying the asset version.
pub const VERSION_PARAM: &str = "v";

/// Appends `v=<asset version>` to http(s) asset URLs.
#[derive(Debug, Clone)]
pub struct CacheBuster {
    version: String,
}

impl CacheBuster {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }

    /// Tag `url` with the asset version.
    ///
    /// Leaves the URL alone when it is empty, not http(s), or already carries
    /// a version marker, so applying it twice never stacks markers.
    pub fn bust(&self, url: &str) -> String {
        let trimmed = url.trim();
        if trimmed.is_empty() || self.version.is_empty() || !is_http(trimmed) {
            return url.to_string();
        }

        let (base, fragment) = match trimmed.find('#') {
            Some(pos) => trimmed.split_at(pos),
            None => (trimmed, ""),
        };

        if has_version_marker(base) {
            return url.to_string();
        }

        let separator = if base.contains('?') {
            if base.ends_with('?') || base.ends_with('&') {
                ""
            } else {
                "&"
            }
        } else {
            "?"
        };

        format!("{}{}{}={}{}", base, separator, VERSION_PARAM, self.version, fragment)
    }

    pub fn bust_template(&self, mut template: Template) -> Template {
        if let Some(icon) = template.icon.as_deref() {
            template.icon = Some(self.bust(icon));
        }
        template
    }

    pub fn bust_templates(&self, templates: Vec<Template>) -> Vec<Template> {
        templates.into_iter().map(|t| self.bust_template(t)).collect()
    }
}

fn is_http(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn has_version_marker(url_without_fragment: &str) -> bool {
    let Some((_, query)) = url_without_fragment.split_once('?') else {
        return false;
    };
    query
        .split('&')
        .any(|pair| pair.split('=').next() == Some(VERSION_PARAM))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::template;

    #[test]
    fn test_bust_appends_marker() {
        let buster = CacheBuster::new("12");
        assert_eq!(buster.bust("https://cdn.x/a.png"), "https://cdn.x/a.png?v=12");
        assert_eq!(buster.bust("http://cdn.x/a.png?size=2"), "http://cdn.x/a.png?size=2&v=12");
        assert_eq!(buster.bust("https://cdn.x/a.png#top"), "https://cdn.x/a.png?v=12#top");
    }

    #[test]
    fn test_bust_is_idempotent() {
        let buster = CacheBuster::new("12");
        let once = buster.bust("https://cdn.x/a.png?size=2");
        assert_eq!(buster.bust(&once), once);
        assert_eq!(once.matches("v=12").count(), 1);
    }

    #[test]
    fn test_existing_marker_of_other_version_is_kept() {
        let buster = CacheBuster::new("12");
        assert_eq!(buster.bust("https://cdn.x/a.png?v=3"), "https://cdn.x/a.png?v=3");
    }

    #[test]
    fn test_similar_param_is_not_a_marker() {
        let buster = CacheBuster::new("12");
        assert_eq!(buster.bust("https://cdn.x/a.png?dev=1"), "https://cdn.x/a.png?dev=1&v=12");
    }

    #[test]
    fn test_non_http_and_empty_untouched() {
        let buster = CacheBuster::new("12");
        assert_eq!(buster.bust(""), "");
        assert_eq!(buster.bust("asset://icons/a.png"), "asset://icons/a.png");
        assert_eq!(buster.bust("data:image/png;base64,AAAA"), "data:image/png;base64,AAAA");
    }

    #[test]
    fn test_bust_templates_skips_missing_icon() {
        let buster = CacheBuster::new("12");
        let mut without = template("b", 2);
        without.icon = None;
        let out = buster.bust_templates(vec![template("a", 1), without]);
        assert!(out[0].icon.as_deref().unwrap().ends_with("?v=12"));
        assert_eq!(out[1].icon, None);
    }
}
