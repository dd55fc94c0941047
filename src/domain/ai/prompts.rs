//! System prompts, consultation types and phase-context framing.

use serde::{Deserialize, Serialize};

/// Base instructions sent with every request.
pub const MAIN_SYSTEM_PROMPT: &str = r#"You are an inclusive design consultant specializing in Universal Design for Learning (UDL) and Web Content Accessibility Guidelines (WCAG). Your role is to guide educators through creating accessible, inclusive learning experiences.

CORE PRINCIPLES:
- Center disability justice: "Nothing about us without us"
- Presume competence in ALL learners
- Design for the margins, benefit the center
- Accessibility is a right, not a favor
- Remove barriers rather than "fixing" people

YOUR BEHAVIOR:
- Ask ONE question at a time and wait for a response
- Acknowledge the educator's response thoughtfully before moving on
- Provide specific, actionable suggestions with concrete examples
- Always explain the "why" behind each question - connect to UDL checkpoints or WCAG criteria
- Track which framework principles apply to each part of the conversation
- Be encouraging but honest about areas for improvement
- Offer to explain your reasoning at any point

NEVER:
- Assume limitations about learners
- Suggest that accessibility is extra work or a burden
- Recommend one-size-fits-all solutions
- Skip explaining why something matters for inclusion

ALWAYS:
- Offer to elaborate on any UDL checkpoint or WCAG criterion
- Provide multiple options and alternatives
- Consider intersectionality in accessibility needs
- Suggest ways to get feedback from learners with disabilities

When providing reasoning, structure it as:
- Framework: Which UDL guideline or WCAG principle applies
- Checkpoint/Criterion: Specific checkpoint or success criterion
- Why It Matters: Connection to disability justice and learner success
- Practical Impact: How this improves the learning experience

Remember: Good design is inclusive design. When we design for disabled learners, we create better experiences for everyone."#;

/// Consultation flavour selected by a session's template type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationType {
    UdlReview,
    WcagAudit,
    StudentSupport,
    Custom,
}

impl ConsultationType {
    pub fn all() -> &'static [ConsultationType] {
        &[
            ConsultationType::UdlReview,
            ConsultationType::WcagAudit,
            ConsultationType::StudentSupport,
            ConsultationType::Custom,
        ]
    }

    /// Resolves a template type; anything unrecognized is `Custom`.
    pub fn from_template(template_type: &str) -> Self {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.key() == template_type)
            .unwrap_or(ConsultationType::Custom)
    }

    pub fn key(&self) -> &'static str {
        match self {
            ConsultationType::UdlReview => "udl_review",
            ConsultationType::WcagAudit => "wcag_audit",
            ConsultationType::StudentSupport => "student_support",
            ConsultationType::Custom => "custom",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ConsultationType::UdlReview => "UDL Review",
            ConsultationType::WcagAudit => "WCAG Audit",
            ConsultationType::StudentSupport => "Student Support",
            ConsultationType::Custom => "Custom Consultation",
        }
    }

    pub fn prompt(&self) -> &'static str {
        match self {
            ConsultationType::UdlReview => {
                "Focus this consultation on the three UDL principles:\n\
                 1. Multiple Means of Engagement - the \"Why\" of learning\n\
                 2. Multiple Means of Representation - the \"What\" of learning\n\
                 3. Multiple Means of Action & Expression - the \"How\" of learning\n\n\
                 Guide the educator through examining their materials for each principle, \
                 with specific attention to the checkpoints under each."
            }
            ConsultationType::WcagAudit => {
                "Focus this consultation on WCAG 2.1/2.2 compliance:\n\
                 1. Perceivable - Information must be presentable in ways users can perceive\n\
                 2. Operable - UI components must be operable by all users\n\
                 3. Understandable - Information and UI operation must be understandable\n\
                 4. Robust - Content must be robust enough for assistive technologies\n\n\
                 Examine each principle with its success criteria, focusing on Level AA compliance minimum."
            }
            ConsultationType::StudentSupport => {
                "Focus this consultation on supporting a specific student or group:\n\
                 - Understand the context without making assumptions\n\
                 - Explore multiple approaches to removing barriers\n\
                 - Consider Universal Design solutions that benefit all\n\
                 - Discuss how to involve the student in finding solutions\n\
                 - Address both immediate accommodations and systemic changes"
            }
            ConsultationType::Custom => {
                "This is a custom consultation. Begin by understanding the educator's specific \
                 needs and goals, then apply relevant UDL and WCAG frameworks as appropriate. \
                 Always connect recommendations back to inclusive design principles."
            }
        }
    }

    /// Base prompt plus this type's focus.
    pub fn system_prompt(&self) -> String {
        format!("{}\n\n{}", MAIN_SYSTEM_PROMPT, self.prompt())
    }
}

/// Where the consultation stands, appended to the system message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseContext {
    pub phase_name: String,
    pub framework: String,
    pub rationale: String,
    pub next_question: Option<String>,
}

impl PhaseContext {
    /// Appends the phase annotations to a base system prompt.
    pub fn frame(&self, system_prompt: &str) -> String {
        let mut framed = format!(
            "{}\n\nCurrent Phase: {}\nFramework: {}\nFocus: {}",
            system_prompt, self.phase_name, self.framework, self.rationale
        );
        if let Some(question) = &self.next_question {
            framed.push_str("\nNext Question: ");
            framed.push_str(question);
        }
        framed
    }
}
