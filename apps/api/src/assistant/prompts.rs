// All LLM prompt text for the assistant. Builders fill in run metadata;
// system prompts enforce JSON-only output.

use crate::text::truncate_chars;

use super::PlanUpload;

/// Characters of extracted upload text included in the plan prompt.
const SNIPPET_MAX_CHARS: usize = 2000;

pub const PLAN_SYSTEM: &str = "You are a FedRAMP proposal assistant. \
    Produce JSON with keys summary (string), draft (markdown string), and \
    deliverables (array of objects with title, description, checklist array \
    of bullet strings). Keep checklist actionable. \
    Do NOT include any text outside the JSON object.";

pub const SUGGEST_SYSTEM: &str = "You are an expert proposal editor. \
    Respond in JSON with keys summary (string) and suggestions (array of 2-4 \
    objects each with summary and content fields). Make content professional, \
    concise, and ready for direct insertion. \
    Do NOT include any text outside the JSON object.";

pub fn plan_user_prompt(
    run_name: &str,
    file_name: &str,
    upload: Option<&PlanUpload>,
    company_prompt: Option<&str>,
) -> String {
    let descriptor = match upload {
        Some(upload) => {
            let kilobytes = (upload.byte_len / 1024).max(1);
            let snippet = truncate_chars(upload.text.as_deref().unwrap_or(""), SNIPPET_MAX_CHARS);
            format!(
                "The PDF ({file_name}) contains {kilobytes}KB of material. \
                Use any readable text snippets below if helpful.\n\n{snippet}"
            )
        }
        None => "No PDF text was readable. Base the outline on the company prompt and run metadata."
            .to_string(),
    };
    let company = company_prompt
        .filter(|prompt| !prompt.trim().is_empty())
        .unwrap_or("Federal solutions emphasising compliance readiness.");
    format!("Company prompt: {company}\n\nRun name: {run_name}\nFile: {file_name}\n\n{descriptor}")
}

pub fn suggest_user_prompt(context: &str, prompt: &str) -> String {
    let context = if context.is_empty() {
        "No draft content yet."
    } else {
        context
    };
    format!("Current proposal context:\n{context}\n\nRequest:\n{prompt}")
}
