#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginPolicy {
    allowed: Vec<String>,
}

impl OriginPolicy {
    pub fn new(allowed: Vec<String>) -> Self {
        Self {
            allowed: allowed
                .into_iter()
                .map(|origin| origin.trim().trim_end_matches('/').to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
        }
    }

    pub fn is_allowed(&self, origin: Option<&str>) -> bool {
        let Some(origin) = origin.map(|value| value.trim().trim_end_matches('/')) else {
            return false;
        };

        self.allowed.iter().any(|allowed| allowed == origin)
    }

    pub fn origins(&self) -> &[String] {
        &self.allowed
    }
}
