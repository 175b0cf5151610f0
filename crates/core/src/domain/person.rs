use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub String);

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PersonId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub first_name: String,
    pub last_name: String,
}

impl Person {
    pub fn new(
        id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self { id: PersonId(id.into()), first_name: first_name.into(), last_name: last_name.into() }
    }

    pub fn full_name(&self) -> String {
        match (self.first_name.trim(), self.last_name.trim()) {
            ("", "") => self.id.0.clone(),
            (first, "") => first.to_string(),
            ("", last) => last.to_string(),
            (first, last) => format!("{first} {last}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Person;

    #[test]
    fn full_name_falls_back_to_identifier_when_blank() {
        assert_eq!(Person::new("P-1", "Ada", "Lovelace").full_name(), "Ada Lovelace");
        assert_eq!(Person::new("P-2", "  ", "Hopper").full_name(), "Hopper");
        assert_eq!(Person::new("P-3", "", "").full_name(), "P-3");
    }
}
