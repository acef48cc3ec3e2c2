/// System prompt used to turn job search parameters into a search engine query.
pub const QUERY_OPTIMIZATION_SYSTEM: &str = "You are a job search expert. Your task is to optimize the given job search parameters
into an effective search query. Focus on:
1. Including relevant job titles and skills
2. Adding location if specified
3. Including company name if specified
4. Adding job type if specified
5. Including experience level if specified
6. Adding salary expectations if specified
7. Including remote work preference if specified
8. Adding time constraints if specified

Format the query to work well with search engines. Use quotes for exact phrases and site: operator
for specific job sites when appropriate. Answer with the query only.";

/// System prompt used to tell direct job postings apart from other search results.
pub const JOB_URL_SYSTEM: &str = "You are an expert at identifying job posting URLs from search results.
Analyze the URLs and their titles/descriptions to determine if they are actual job postings.
Return a JSON array of objects with:
- url: the URL
- is_job_posting: boolean indicating if it's a job posting
- confidence: number between 0 and 1 indicating confidence
- reason: brief explanation of why it is/isn't a job posting
Prioritize URLs that are direct job postings over job board search results or company career pages.";

/// System prompt used to find the application form fields of a posting.
pub const FORM_FIELDS_SYSTEM: &str = "You are an expert at analyzing job postings and identifying required application form fields.
Analyze the job posting and identify ONLY the form fields that an applicant needs to fill out.
Return a JSON object where each key is a form field name and the value is an object with:
- required: boolean indicating if the field is mandatory
- field_type: type of input needed (text, number, date, select, etc.)
- description: brief description of what should go in this field
Do not include any predefined fields or assumptions. Only include fields explicitly mentioned in the job posting.";

/// A system and user message pair ready to be sent to a `ChatClient`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
}

/// The `PromptBuilder` struct is responsible for constructing chat prompts.
/// It collects labelled fields and free-form sections and renders them as the user message.
pub struct PromptBuilder {
    /// The system message.
    system: String,
    /// `Label: value` lines, in insertion order.
    fields: Vec<(String, String)>,
    /// Labelled blocks appended after the fields.
    sections: Vec<(String, String)>,
    /// The closing instruction.
    instruction: Option<String>,
}

impl PromptBuilder {
    /// Creates a new `PromptBuilder` with the given system message.
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            fields: Vec::new(),
            sections: Vec::new(),
            instruction: None,
        }
    }

    /// Adds a `Label: value` line. Missing values render as an empty value.
    pub fn field(mut self, label: impl Into<String>, value: Option<&str>) -> Self {
        self.fields.push((label.into(), value.unwrap_or_default().to_string()));
        self
    }

    /// Adds a labelled multi-line block, such as page content.
    pub fn section(mut self, label: impl Into<String>, body: impl Into<String>) -> Self {
        self.sections.push((label.into(), body.into()));
        self
    }

    /// Sets the instruction that closes the user message.
    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    /// Builds the prompt.
    pub fn build(&self) -> ChatPrompt {
        let mut parts = Vec::new();

        let fields = self
            .fields
            .iter()
            .map(|(label, value)| format!("{}: {}", label, value.trim()))
            .collect::<Vec<_>>()
            .join("\n");
        if !fields.is_empty() {
            parts.push(fields);
        }

        for (label, body) in &self.sections {
            parts.push(format!("{}:\n{}", label, Self::clean_text(body)));
        }

        if let Some(instruction) = &self.instruction {
            parts.push(instruction.clone());
        }

        ChatPrompt {
            system: self.system.clone(),
            user: parts.join("\n\n"),
        }
    }

    /// Cleans the given text by removing blank lines and normalizing whitespace.
    fn clean_text(text: &str) -> String {
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.split_whitespace().collect::<Vec<&str>>().join(" "))
            .collect::<Vec<String>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_builder() {
        let prompt = PromptBuilder::new(QUERY_OPTIMIZATION_SYSTEM)
            .field("Job Title", Some("Rust Engineer"))
            .field("Location", None)
            .field("Remote", Some("remote"))
            .build();

        assert_eq!(prompt.system, QUERY_OPTIMIZATION_SYSTEM);
        assert_eq!(prompt.user, "Job Title: Rust Engineer\nLocation: \nRemote: remote");
    }

    #[test]
    fn test_sections_are_cleaned() {
        let prompt = PromptBuilder::new(FORM_FIELDS_SYSTEM)
            .section("Content", "  Apply   now\n\n\n  Email    required  ")
            .instruction("Identify the required application form fields.")
            .build();

        assert_eq!(
            prompt.user,
            "Content:\nApply now\nEmail required\n\nIdentify the required application form fields."
        );
    }
}
