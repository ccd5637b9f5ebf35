// All LLM prompt templates for the interview pipeline.
// Placeholders are `{name}` and are filled by `fill_template` before sending.
use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("valid regex"));

/// Fills every `{name}` placeholder in a single pass. Substituted text is never
/// rescanned, so a value containing `{answer}` stays literal. Names without a
/// value are left as written.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| {
            values
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Opening and fresh questions. Replace: {job_role}, {resume_text}
pub const QUESTION_PROMPT_TEMPLATE: &str = "\
Based on the following resume text and the role the candidate is applying for, generate a \
single technical interview question. It must be brief, around 2-3 lines.

The question should be moderate to high difficulty and should focus on:
1. The projects mentioned in the resume
2. The technical skills listed
3. The technologies used in their projects
4. The specific requirements and responsibilities of the role they're applying for

The question should test their deep understanding of the technologies and concepts they claim \
to know, while also assessing their fit for the specific role. Make it specific and detailed, \
requiring them to demonstrate practical knowledge.

Role: {job_role}
Resume Text:
{resume_text}

Generate only the question, without any additional explanation or context.";

/// Follow-up after an answered round.
/// Replace: {job_role}, {previous_question}, {answer}, {evaluation_json}, {resume_text}
pub const FOLLOW_UP_PROMPT_TEMPLATE: &str = "\
Based on the following information, generate a follow-up interview question for a {job_role} \
candidate.

Previous Question: {previous_question}
Candidate's Answer: {answer}
Evaluation: {evaluation_json}

If the answer was irrelevant or scored low on technical accuracy, generate a new question based \
on the resume that tests their knowledge in a different area.
If the answer was good, generate a deeper follow-up question that builds on their response and \
tests their understanding further.

Resume Text:
{resume_text}

Generate only the question, without any additional explanation or context.";

/// Per-answer evaluation. Replace: {template_discipline}, {question}, {answer}
pub const ANSWER_EVALUATION_PROMPT_TEMPLATE: &str = "\
As an expert technical interviewer, evaluate the following interview answer.
Provide your evaluation in EXACTLY this format (including the dashes and spacing):

Clarity Score (1-10): [X]
- Brief explanation: [Your explanation]

Technical Accuracy Score (1-10): [X]
- Brief explanation: [Your explanation]

Language & Communication Score (1-10): [X]
- Brief explanation: [Your explanation]

Key Strengths:
- [Point 1]
- [Point 2]
- [Point 3]

Areas to Improve:
- [Point 1]
- [Point 2]
- [Point 3]

Recommendations:
- [Point 1]
- [Point 2]
- [Point 3]

Overall Score (1-10): [X]

Question being evaluated: \"{question}\"

Candidate's answer: \"{answer}\"

Remember to:
1. Use numbers 1-10 for all scores
2. Keep explanations concise (1-2 sentences)
3. Provide exactly 3 bullet points for each list
4. Follow the exact format above

{template_discipline}";

/// One block per round inside the overall prompt. Replace: {n}, {question}, {answer}, {evaluation_json}
pub const ROUND_SUMMARY_TEMPLATE: &str = "\
Q{n}: {question}
A{n}: {answer}
E{n}: {evaluation_json}
";

/// Final evaluation over every round.
/// Replace: {job_role}, {round_count}, {rounds}, {template_discipline}
pub const OVERALL_EVALUATION_PROMPT_TEMPLATE: &str = "\
You are an expert technical interviewer evaluating a candidate for a {job_role} position.
The candidate has completed {round_count} questions. Here are their responses:

{rounds}

IMPORTANT: You must follow this EXACT template. Replace the [text] with your evaluation, keeping \
all formatting, spacing, and dashes exactly as shown:

Overall Technical Proficiency (1-10): [single number 1-10]
- Brief explanation: [single sentence explanation]

Communication Skills (1-10): [single number 1-10]
- Brief explanation: [single sentence explanation]

Problem-Solving Ability (1-10): [single number 1-10]
- Brief explanation: [single sentence explanation]

Key Strengths:
- [first strength point]
- [second strength point]
- [third strength point]

Areas for Growth:
- [first growth area]
- [second growth area]
- [third growth area]

Final Recommendations:
- [first recommendation]
- [second recommendation]
- [third recommendation]

Hiring Recommendation: [EXACTLY one of: STRONG HIRE, HIRE, CONSIDER, DO NOT HIRE]
- Justification: [2-3 sentence justification]

Overall Interview Score (1-10): [single number 1-10]

CRITICAL RULES:
1. All scores must be single whole numbers between 1 and 10
2. Each bullet point section must have EXACTLY 3 points
3. Hiring recommendation must be EXACTLY one of: STRONG HIRE, HIRE, CONSIDER, DO NOT HIRE
4. Keep all dashes, colons, and spacing exactly as shown

{template_discipline}";
