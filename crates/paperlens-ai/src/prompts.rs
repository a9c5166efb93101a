//! Prompt templates. Inputs arrive already clipped to their budgets.

pub fn metadata(text: &str) -> String {
    format!(
        r#"Analyze the first few pages of this research paper and extract the following metadata in JSON format:
1. Title (The main title of the paper)
2. Authors (List of author names)
3. Year (Publication year, if found. If not, null)

Return ONLY valid JSON like this:
{{
  "title": "The Title Here",
  "authors": ["Author One", "Author Two"],
  "year": 2024
}}

Text to analyze:
{text}"#
    )
}

pub fn summary(text: &str) -> String {
    format!(
        r#"You are an expert research paper analyst. Provide a comprehensive summary of this paper.

**Paper Content:**
{text}

**Instructions:**
Provide a structured summary with these exact headers:
## 1. Main Research Question
## 2. Methodology
## 3. Key Findings
## 4. Conclusions & Implications
## 5. Significance

Keep it between 400-600 words. Be specific."#
    )
}

pub fn keywords(text: &str) -> String {
    format!(
        "Extract 8-10 technical keywords from this text. Return them as a comma-separated list. No numbering.\n\nText:\n{text}"
    )
}

pub fn answer(document: &str, history: &str, question: &str) -> String {
    format!(
        r#"You are a helpful research assistant.
**Paper Content:** {document}
**History:** {history}
**User Question:** {question}

Answer based strictly on the paper."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_prompt_lists_all_five_sections() {
        let prompt = summary("body");
        for heading in [
            "## 1. Main Research Question",
            "## 2. Methodology",
            "## 3. Key Findings",
            "## 4. Conclusions & Implications",
            "## 5. Significance",
        ] {
            assert!(prompt.contains(heading), "missing {heading}");
        }
        assert!(prompt.contains("400-600 words"));
    }

    #[test]
    fn keyword_prompt_includes_the_text() {
        assert!(keywords("graph neural networks").contains("graph neural networks"));
    }
}
