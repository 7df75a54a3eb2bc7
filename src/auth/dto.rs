use serde::{Deserialize, Serialize};

use crate::forms::FormErrors;

/// Registration form body. Missing fields read as empty so they fail
/// validation instead of the extractor.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub remember: Option<String>, // checkbox: present when ticked
}

impl LoginForm {
    pub fn remember(&self) -> bool {
        matches!(self.remember.as_deref(), Some(v) if !matches!(v, "" | "0" | "false" | "off"))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// Echo of a submitted form, without secrets, plus its errors.
#[derive(Debug, Default, Serialize)]
pub struct FormView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub errors: FormErrors,
}

#[derive(Debug, Serialize)]
pub struct FormPage {
    pub form: FormView,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remember_checkbox_values() {
        let mut form = LoginForm::default();
        assert!(!form.remember());
        form.remember = Some("y".into());
        assert!(form.remember());
        form.remember = Some("false".into());
        assert!(!form.remember());
    }

    #[test]
    fn form_view_never_carries_passwords() {
        let page = FormPage {
            form: FormView {
                email: Some("a@b.io".into()),
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["form"]["email"], "a@b.io");
        assert!(json["form"].get("password").is_none());
        assert!(json["form"].get("username").is_none());
    }
}
