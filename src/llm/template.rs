//! 提示词模板
//!
//! 模板中的占位符形如 `{{name}}`。填充按参数给出的顺序依次做字面替换：
//! 若前一个参数的值恰好包含后一个参数的占位符，后一次替换也会作用在已替换的文本上。

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::{AppError, Result};

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("valid placeholder regex"));

/// 单个占位符的填充参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateArg {
    pub name: String,
    pub value: String,
}

impl TemplateArg {
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }

    fn token(&self) -> String {
        format!("{{{{{}}}}}", self.name)
    }
}

/// 命名的提示词模板，加载后不可修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    name: String,
    text: String,
}

impl Template {
    pub fn new(name: &str, text: &str) -> Self {
        Self {
            name: name.to_string(),
            text: text.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 模板中出现的占位符名称（按首次出现顺序，去重）
    pub fn placeholders(&self) -> Vec<String> {
        placeholders_in(&self.text)
    }

    /// 填充模板
    ///
    /// 每个参数的占位符必须字面出现在模板中，否则返回 [`AppError::Template`]。
    pub fn fill(&self, args: &[TemplateArg]) -> Result<String> {
        let mut filled = self.text.clone();

        for arg in args {
            let token = arg.token();
            if !self.text.contains(&token) {
                return Err(AppError::Template {
                    template: self.name.clone(),
                    name: arg.name.clone(),
                });
            }
            filled = filled.replace(&token, &arg.value);
        }

        let remaining = placeholders_in(&filled);
        if !remaining.is_empty() {
            debug!(
                "Template '{}' filled with unfilled placeholders left: {:?}",
                self.name, remaining
            );
        }

        Ok(filled)
    }
}

/// 提取文本中的占位符名称
pub fn placeholders_in(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for capture in PLACEHOLDER_RE.captures_iter(text) {
        let name = capture[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_replaces_all_occurrences() {
        let template = Template::new("greeting", "Hi {{name}}! Bye {{name}}. Topic: {{topic}}");
        let filled = template
            .fill(&[
                TemplateArg::new("name", "Ada"),
                TemplateArg::new("topic", "recursion"),
            ])
            .unwrap();

        assert_eq!(filled, "Hi Ada! Bye Ada. Topic: recursion");
        assert!(placeholders_in(&filled).is_empty());
    }

    #[test]
    fn test_fill_missing_placeholder_fails() {
        let template = Template::new("hint", "Question: {{question}}");
        let err = template
            .fill(&[
                TemplateArg::new("question", "What is a loop?"),
                TemplateArg::new("material", "chapter 3"),
            ])
            .unwrap_err();

        match err {
            AppError::Template { template, name } => {
                assert_eq!(template, "hint");
                assert_eq!(name, "material");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unused_placeholders_are_left_untouched() {
        let template = Template::new("partial", "{{a}} and {{b}}");
        let filled = template.fill(&[TemplateArg::new("a", "x")]).unwrap();
        assert_eq!(filled, "x and {{b}}");
    }

    #[test]
    fn test_sequential_substitution_reenters_earlier_values() {
        // 前一个值中出现的 {{answer}} 会被后一个参数再次替换
        let template = Template::new("chat", "Q: {{question}} A: {{answer}}");
        let filled = template
            .fill(&[
                TemplateArg::new("question", "what does {{answer}} mean?"),
                TemplateArg::new("answer", "42"),
            ])
            .unwrap();

        assert_eq!(filled, "Q: what does 42 mean? A: 42");
    }

    #[test]
    fn test_placeholder_only_in_value_is_still_missing() {
        let template = Template::new("chat", "Q: {{question}}");
        let result = template.fill(&[
            TemplateArg::new("question", "{{answer}}"),
            TemplateArg::new("answer", "42"),
        ]);
        assert!(matches!(result, Err(AppError::Template { .. })));
    }

    #[test]
    fn test_placeholders_listing() {
        let template = Template::new("t", "{{b}} {{a}} {{b}} {{ not_one }}");
        assert_eq!(template.placeholders(), vec!["b".to_string(), "a".to_string()]);
    }
}
