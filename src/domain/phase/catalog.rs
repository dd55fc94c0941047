//! Built-in UDL/WCAG consultation script.
//!
//! Seven phases, from context gathering through recommendations. Loaded
//! lazily once per process and shared behind an `Arc`.

use once_cell::sync::Lazy;
use std::sync::Arc;

use super::{PhaseDefinition, PhaseScript, Rationale};

static INCLUSIVE_DESIGN_SCRIPT: Lazy<Arc<PhaseScript>> =
    Lazy::new(|| Arc::new(PhaseScript::from_catalog(phases(), generic_rationale())));

/// The shared built-in script.
pub fn inclusive_design_script() -> Arc<PhaseScript> {
    Arc::clone(&INCLUSIVE_DESIGN_SCRIPT)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn rationale(
    framework: &str,
    why: &str,
    principle: &str,
    sources: &[&str],
    connection: &str,
    confidence: &str,
    confidence_reason: &str,
) -> Rationale {
    Rationale {
        framework: framework.to_string(),
        rationale: why.to_string(),
        principle: principle.to_string(),
        sources: strings(sources),
        connection: connection.to_string(),
        confidence_label: confidence.to_string(),
        confidence_rationale: confidence_reason.to_string(),
    }
}

fn generic_rationale() -> Rationale {
    rationale(
        "Inclusive Design",
        "Every design decision affects accessibility.",
        "Design inclusively from the start.",
        &["Universal Design Principles", "CAST UDL Guidelines", "WCAG 2.1/2.2"],
        "The AI applies inclusive design principles to help you create learning experiences that work for all students.",
        "Medium",
        "General inclusive design principles apply broadly but specific recommendations depend on context.",
    )
}

fn phases() -> Vec<PhaseDefinition> {
    vec![
        PhaseDefinition::new(
            "context",
            "Context Gathering",
            strings(&[
                "What course or learning material are you designing?",
                "Who are your learners? Describe the group you're designing for.",
                "What are the primary learning objectives for this experience?",
                "What delivery format will you use (in-person, online, hybrid)?",
            ]),
            rationale(
                "Foundation",
                "Understanding context helps us avoid assumptions and design for actual learners, not imagined ones.",
                "Nothing about us without us - we need to know who we're designing for.",
                &[
                    "CAST UDL Guidelines 2.2 - Learner Variability",
                    "Disability Justice Primer - Sins Invalid",
                    "Universal Design Principles - Ron Mace",
                ],
                "Gathering context about your learning environment, subject matter, and current practices helps the AI tailor recommendations specifically to your situation rather than providing generic advice.",
                "High",
                "Context-gathering questions have well-established frameworks and directly inform all subsequent recommendations.",
            ),
        ),
        PhaseDefinition::new(
            "learner_analysis",
            "Learner Analysis",
            strings(&[
                "What do you currently know about your learners' preferences and needs?",
                "How do you typically learn about accommodations needed by your learners?",
                "What barriers have you encountered before when trying to make learning accessible?",
                "What assumptions might you be making about your learners' abilities?",
            ]),
            rationale(
                "UDL Principle: Learner Variability",
                "Recognizing learner differences as the norm, not the exception, is fundamental to UDL.",
                "Presume competence - barriers are in the design, not the learner.",
                &[
                    "CAST UDL Guidelines - Recruiting Interest (7.1-7.3)",
                    "Rose & Meyer - Teaching Every Student in the Digital Age",
                    "IDEA - Individuals with Disabilities Education Act",
                ],
                "Understanding your learners' diverse needs allows the AI to suggest specific accommodations and universal design strategies that address actual barriers rather than assumed ones.",
                "High",
                "Research strongly supports that understanding learner variability leads to more effective instructional design.",
            ),
        ),
        PhaseDefinition::new(
            "udl_engagement",
            "UDL: Engagement",
            strings(&[
                "How will learners see the relevance of this material to their own lives?",
                "What meaningful choices can learners make in how they engage with the material?",
                "How are you building community and collaboration among learners?",
                "How do you support learners' persistence when they encounter frustration?",
                "How do you foster self-reflection and metacognition?",
            ]),
            rationale(
                "UDL Guideline: Provide Multiple Means of Engagement",
                "Affect represents a crucial element to learning. Learners differ in what motivates them.",
                "Design for the margins - what engages marginalized learners benefits everyone.",
                &[
                    "CAST Checkpoint 7: Recruiting Interest",
                    "CAST Checkpoint 8: Sustaining Effort & Persistence",
                    "CAST Checkpoint 9: Self-Regulation",
                    "Dweck - Growth Mindset Research",
                ],
                "Engagement strategies you implement will directly impact student motivation and persistence. The AI draws from research on what sustains learner effort across diverse populations.",
                "High",
                "Multiple Means of Engagement is backed by extensive neuroscience research on affective networks.",
            ),
        ),
        PhaseDefinition::new(
            "udl_representation",
            "UDL: Representation",
            strings(&[
                "In how many different formats is information available (text, audio, video, etc.)?",
                "How do you support vocabulary and symbol comprehension?",
                "What scaffolds exist for activating or supplying background knowledge?",
                "How do you highlight patterns, critical features, and big ideas?",
            ]),
            rationale(
                "UDL Guideline: Provide Multiple Means of Representation",
                "Learners perceive and comprehend information differently. There is no single optimal way to present information.",
                "Accessibility is a right - information should be accessible to all.",
                &[
                    "CAST Checkpoint 1: Perception",
                    "CAST Checkpoint 2: Language & Symbols",
                    "CAST Checkpoint 3: Comprehension",
                    "WCAG 2.1 - Perceivable Guidelines",
                ],
                "How you present information determines who can access it. The AI recommends multiple formats and representations based on accessibility research and your specific content type.",
                "High",
                "Recognition networks research provides strong evidence for varied representation strategies.",
            ),
        ),
        PhaseDefinition::new(
            "udl_expression",
            "UDL: Expression",
            strings(&[
                "What options exist for learners to demonstrate their knowledge?",
                "How can learners use different tools and media for communication?",
                "What scaffolds support planning, strategy development, and organizing?",
                "Are there flexible submission formats and timelines?",
                "How do learners receive and act on feedback?",
            ]),
            rationale(
                "UDL Guideline: Provide Multiple Means of Action & Expression",
                "Learners differ in how they navigate learning and express what they know.",
                "Remove barriers - let learners show knowledge in ways that work for them.",
                &[
                    "CAST Checkpoint 4: Physical Action",
                    "CAST Checkpoint 5: Expression & Communication",
                    "CAST Checkpoint 6: Executive Functions",
                    "Assessment for Learning Research - Black & Wiliam",
                ],
                "Offering flexible ways to demonstrate learning ensures you're measuring knowledge, not barriers. The AI suggests alternatives based on your assessment goals.",
                "High",
                "Strategic networks research strongly supports flexible expression options.",
            ),
        ),
        PhaseDefinition::new(
            "wcag_review",
            "WCAG Review",
            strings(&[
                "Perceivable: Do all images have alt text? Is color contrast sufficient? Are there multiple formats for content?",
                "Operable: Is everything keyboard accessible? Are timing requirements adjustable? Is navigation consistent?",
                "Understandable: Is navigation clear and consistent? Are error messages helpful and specific?",
                "Robust: Does your content work with assistive technologies? Is it cross-platform compatible?",
            ]),
            rationale(
                "WCAG 2.1/2.2 Principles",
                "Digital accessibility ensures everyone can perceive, operate, and understand content.",
                "Universal access - technology should work for everyone.",
                &[
                    "WCAG 2.1 Success Criteria (Level A & AA)",
                    "WCAG 2.2 New Success Criteria",
                    "Section 508 Standards",
                    "WAI-ARIA Authoring Practices",
                ],
                "Technical accessibility standards ensure your digital content works with assistive technologies. The AI checks your content against established success criteria.",
                "Medium-High",
                "WCAG provides clear success criteria, though implementation specifics may vary by platform.",
            ),
        ),
        PhaseDefinition::new(
            "assessment",
            "Recommendations",
            strings(&[
                "How will you assess if your accessibility goals are being met?",
                "What feedback mechanisms exist for learners to report barriers?",
                "How will you iterate and improve based on feedback received?",
            ]),
            rationale(
                "Continuous Improvement",
                "Accessibility is ongoing. Feedback from disabled users is essential for real inclusion.",
                "Nothing about us without us - center disabled voices in evaluation.",
                &[
                    "Disability Justice Framework - Sins Invalid",
                    "Participatory Design Research",
                    "Continuous Improvement Cycle - Deming",
                    "User-Centered Design Principles",
                ],
                "Recommendations improve when informed by actual user feedback. The AI suggests evaluation strategies that center the voices of disabled learners.",
                "High",
                "Evidence strongly supports that user feedback leads to more effective accessibility solutions.",
            ),
        ),
    ]
}
