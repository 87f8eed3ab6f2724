pub mod dependencies;
pub mod target;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub allowed: bool,
    pub messages: Vec<String>,
}

impl ValidationReport {
    pub fn pass() -> Self {
        Self {
            allowed: true,
            messages: Vec::new(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            messages: vec![message.into()],
        }
    }

    pub fn from_failures(failures: Vec<String>) -> Self {
        if failures.is_empty() {
            Self::pass()
        } else {
            Self::fail(failures.join("\n"))
        }
    }

    pub fn message(&self) -> String {
        self.messages.join("\n")
    }
}
