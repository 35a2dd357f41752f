//! 内置提示词

use once_cell::sync::Lazy;

use crate::llm::template::Template;

/// 作业完成后的主动反馈
pub static ASSESSMENT_FEEDBACK: Lazy<Template> = Lazy::new(|| {
    Template::new(
        "assessment_feedback",
        r#"You are a supportive tutor giving feedback on a completed assignment.

Assignment: {{assessment}}
Correctness: {{correctness}}
Result: {{outcome}}
The result shows {{performance}}.
{{guidance}}

Write two to four sentences of feedback addressed directly to the student.
Do not repeat the raw numbers. Respond with a JSON object containing the field "feedback"."#,
    )
});

/// 基于课程材料的学习提示
pub static HINT: Lazy<Template> = Lazy::new(|| {
    Template::new(
        "hint",
        r#"You are a tutor helping a student who is stuck. Give a hint that points them in the right
direction without revealing the full solution.

Relevant course material:
{{material}}

Student question: {{question}}

Respond with a JSON object containing the field "hint"."#,
    )
});

/// 导师对话
pub static TUTOR_CHAT: Lazy<Template> = Lazy::new(|| {
    Template::new(
        "tutor_chat",
        r#"You are a patient tutor for an online course. {{language}}

{{history}}
Student: {{question}}

Answer the student's latest message. Respond with a JSON object containing the field "answer"."#,
    )
});

/// 问题分类
pub static CATEGORIZE_QUESTION: Lazy<Template> = Lazy::new(|| {
    Template::new(
        "categorize_question",
        r#"Classify the following student question.
Use "content" for questions about course topics, "organisational" for deadlines, grading or
course logistics, "technical" for problems with the learning platform and "other" otherwise.

Question: {{question}}

Respond with a JSON object containing "category" and a one sentence "summary"."#,
    )
});
