use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use tracing::info;

use crate::models::interview::{DimensionScore, Interview, OverallEvaluation};

/// Stores a human-readable report of a completed interview.
#[async_trait]
pub trait ReportArchive: Send + Sync {
    /// Returns the object key the report was written to.
    async fn store_report(&self, interview: &Interview) -> anyhow::Result<String>;
}

pub struct S3ReportArchive {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ReportArchive {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

pub fn report_key(interview: &Interview) -> String {
    format!("interviews/{}/{}.md", interview.owner_id, interview.id)
}

#[async_trait]
impl ReportArchive for S3ReportArchive {
    async fn store_report(&self, interview: &Interview) -> anyhow::Result<String> {
        let key = report_key(interview);
        let md_content = render_interview_to_md(interview);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(md_content.into_bytes()))
            .content_type("text/markdown")
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("S3 upload failed: {e}"))?;

        info!("Uploaded interview report to s3://{}/{}", self.bucket, key);
        Ok(key)
    }
}

/// Renders the interview, every round and the final verdict as markdown.
pub fn render_interview_to_md(interview: &Interview) -> String {
    let mut md = format!("# Interview Report: {}\n\n", interview.job_role);
    md.push_str(&format!("- **Interview:** {}\n", interview.id));
    md.push_str(&format!("- **Status:** {}\n", interview.status));
    md.push_str(&format!(
        "- **Started:** {}\n\n",
        interview.created_at.format("%Y-%m-%d %H:%M UTC")
    ));

    for (i, round) in interview.questions.iter().enumerate() {
        let e = &round.evaluation;
        md.push_str(&format!("## Question {}\n\n", i + 1));
        md.push_str(&format!("**Q:** {}\n\n", round.question));
        md.push_str(&format!("**A:** {}\n\n", round.answer));
        push_score(&mut md, "Clarity", &e.clarity);
        push_score(&mut md, "Technical Accuracy", &e.technical_accuracy);
        push_score(&mut md, "Language & Communication", &e.language);
        md.push_str(&format!("- **Overall:** {}/10\n\n", e.overall_score));
        push_list(&mut md, "Strengths", &e.strengths);
        push_list(&mut md, "Areas to Improve", &e.areas_for_improvement);
        push_list(&mut md, "Recommendations", &e.recommendations);
    }

    if let Some(overall) = &interview.overall_evaluation {
        push_overall(&mut md, overall);
    }
    md
}

fn push_overall(md: &mut String, overall: &OverallEvaluation) {
    md.push_str("## Overall Evaluation\n\n");
    md.push_str(&format!(
        "**Hiring Recommendation:** {}\n\n{}\n\n",
        overall.hiring_recommendation.decision, overall.hiring_recommendation.justification
    ));
    push_score(md, "Technical Proficiency", &overall.technical_proficiency);
    push_score(md, "Communication Skills", &overall.communication_skills);
    push_score(md, "Problem-Solving Ability", &overall.problem_solving_ability);
    md.push_str(&format!("- **Overall Interview Score:** {}/10\n\n", overall.overall_score));
    push_list(md, "Key Strengths", &overall.strengths);
    push_list(md, "Areas for Growth", &overall.areas_for_growth);
    push_list(md, "Final Recommendations", &overall.recommendations);
}

fn push_score(md: &mut String, label: &str, score: &DimensionScore) {
    md.push_str(&format!(
        "- **{label}:** {}/10 ({})\n",
        score.score, score.explanation
    ));
}

fn push_list(md: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    md.push_str(&format!("### {title}\n\n"));
    for item in items {
        md.push_str(&format!("- {item}\n"));
    }
    md.push('\n');
}
