//! Title templates.

use std::{fmt, sync::Arc};

/// Programmatic template: receives the winning title, if any.
pub type TitleTemplateFn = Arc<dyn Fn(Option<&str>) -> Option<String> + Send + Sync>;

/// How the final title is derived from the winning `title`.
#[derive(Clone)]
pub enum TitleTemplate {
    /// `titleTemplate: null` - the title is used as is.
    Passthrough,
    /// `%s` is replaced by the title.
    Pattern(String),
    Func(TitleTemplateFn),
}

impl TitleTemplate {
    /// Produce the final title. `None` or an empty result means no title.
    pub fn apply(&self, title: Option<&str>) -> Option<String> {
        let result = match self {
            Self::Passthrough => title.map(str::to_owned),
            Self::Pattern(pattern) => title.map(|title| pattern.replace("%s", title)),
            Self::Func(template) => template(title),
        };
        result.filter(|title| !title.is_empty())
    }
}

impl fmt::Debug for TitleTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passthrough => f.write_str("Passthrough"),
            Self::Pattern(pattern) => f.debug_tuple("Pattern").field(pattern).finish(),
            Self::Func(_) => f.write_str("Func(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough() {
        assert_eq!(TitleTemplate::Passthrough.apply(Some("Home")).as_deref(), Some("Home"));
        assert_eq!(TitleTemplate::Passthrough.apply(None), None);
    }

    #[test]
    fn test_pattern() {
        let template = TitleTemplate::Pattern("%s | template".into());
        assert_eq!(template.apply(Some("test")).as_deref(), Some("test | template"));
        // Without a title there is nothing to substitute
        assert_eq!(template.apply(None), None);

        let fixed = TitleTemplate::Pattern("Always this".into());
        assert_eq!(fixed.apply(Some("ignored")).as_deref(), Some("Always this"));
    }

    #[test]
    fn test_func() {
        let template = TitleTemplate::Func(Arc::new(|title: Option<&str>| {
            Some(match title {
                Some(title) => format!("{title} - Site"),
                None => "Site".to_owned(),
            })
        }));
        assert_eq!(template.apply(Some("About")).as_deref(), Some("About - Site"));
        assert_eq!(template.apply(None).as_deref(), Some("Site"));
    }

    #[test]
    fn test_empty_result_means_no_title() {
        let template = TitleTemplate::Func(Arc::new(|_: Option<&str>| Some(String::new())));
        assert_eq!(template.apply(Some("x")), None);
        assert_eq!(TitleTemplate::Pattern("%s".into()).apply(Some("")), None);
    }
}
