//! Guided-tour script — fixed linear sequence of walkthrough steps.

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// One step of the guided walkthrough.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TourStep {
    /// Stable tag, e.g. `create-post`.
    pub id: String,
    pub title: String,
    pub description: String,
    /// UI element selector to highlight.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Route to navigate to when the step becomes current.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl TourStep {
    pub fn new(id: &str, title: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            target: None,
            link: None,
        }
    }

    pub fn with_target(mut self, target: &str) -> Self {
        self.target = Some(target.to_string());
        self
    }

    pub fn with_link(mut self, link: &str) -> Self {
        self.link = Some(link.to_string());
        self
    }

    /// The bot line announcing this step.
    pub fn bot_line(&self) -> String {
        format!("{}: {}", self.title, self.description)
    }
}

/// Ordered, non-empty tour script. A step's index is its position and doubles
/// as the session's progress cursor.
#[derive(Debug, Clone)]
pub struct TourScript {
    steps: Vec<TourStep>,
}

impl TourScript {
    /// Build a script, validating that it is non-empty with unique step ids.
    pub fn new(steps: Vec<TourStep>) -> Result<Self, CatalogError> {
        if steps.is_empty() {
            return Err(CatalogError::EmptyTour);
        }
        let mut seen = std::collections::HashSet::new();
        for step in &steps {
            if !seen.insert(step.id.clone()) {
                return Err(CatalogError::DuplicateStep {
                    id: step.id.clone(),
                });
            }
        }
        Ok(Self { steps })
    }

    /// The production walkthrough shipped with the platform.
    pub fn builtin() -> Self {
        Self::new(builtin_steps()).expect("builtin tour script is valid")
    }

    pub fn steps(&self) -> &[TourStep] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&TourStep> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Whether `index` is the final step.
    pub fn is_last(&self, index: usize) -> bool {
        index + 1 >= self.steps.len()
    }
}

impl Default for TourScript {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_steps() -> Vec<TourStep> {
    vec![
        TourStep::new(
            "welcome",
            "Welcome to Our Platform",
            "This tour will guide you through the main features of our social media platform.",
        )
        .with_target("body"),
        TourStep::new(
            "home",
            "Home Feed",
            "This is where you can see posts from all users and communities.",
        )
        .with_target(".navbar")
        .with_link("/"),
        TourStep::new(
            "create-post",
            "Create Posts",
            "Click here to create a new post with text and images. You can also use our AI \
             assistant to help generate content!",
        )
        .with_target(".navbar")
        .with_link("/create"),
        TourStep::new(
            "communities",
            "Communities",
            "Explore and join communities based on your interests or create your own.",
        )
        .with_target(".navbar")
        .with_link("/communities"),
        TourStep::new(
            "ai-features",
            "AI Content Assistance",
            "When creating a post, scroll down to find our AI assistant that can generate \
             content ideas or enhance what you write.",
        )
        .with_target(".navbar")
        .with_link("/create"),
    ]
}
