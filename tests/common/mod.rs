#![allow(dead_code)]

use std::path::PathBuf;

use bevalid::{Document, FormOptions, FormValidator, NodeId, parse_html};
use tempfile::TempDir;

/// Sign-up form exercising every built-in rule
pub const SIGNUP_FORM: &str = r#"<!DOCTYPE html>
<html>
<body>
  <form id="signup">
    <label>Email <input type="email" name="email" data-bevalid data-bevalid-required data-bevalid-email value=""></label>
    <label>Phone <input name="phone" data-bevalid data-bevalid-phone value="123-456-7890"></label>
    <label>Site <input name="site" data-bevalid data-bevalid-url value=""></label>
    <label>Min <input name="min" data-bevalid data-bevalid-number data-bevalid-larger-than="max" value="5"></label>
    <label>Max <input name="max" data-bevalid data-bevalid-number value="10"></label>
    <label>Host <input name="host" data-bevalid data-bevalid-hostname value="example.com"></label>
    <label>Terms <input type="checkbox" name="terms" value="yes" data-bevalid data-bevalid-required></label>
    <label>Bio <textarea name="bio" data-bevalid></textarea></label>
    <button type="submit">Sign up</button>
  </form>
</body>
</html>
"#;

pub fn signup_validator() -> FormValidator {
    FormValidator::attach(parse_html(SIGNUP_FORM), "#signup", FormOptions::default())
        .expect("sign-up form has a container")
}

pub fn field(validator: &FormValidator, name: &str) -> NodeId {
    validator
        .find_field(name)
        .unwrap_or_else(|| panic!("no field named {}", name))
}

/// Texts of the `<li>` items in `block`
pub fn block_messages(doc: &Document, block: NodeId) -> Vec<String> {
    doc.descendants(block)
        .into_iter()
        .filter(|&node| doc.tag(node) == Some("li"))
        .map(|node| doc.text_content(node))
        .collect()
}

/// Number of error blocks attached to the document
pub fn block_count(validator: &FormValidator) -> usize {
    let wrap = format!("{}-wrap", validator.error_class());
    let doc = validator.document();
    doc.descendants(doc.root())
        .into_iter()
        .filter(|&node| doc.has_class(node, &wrap))
        .count()
}

/// Write `files` into a fresh temporary directory
pub fn temp_files(files: &[(&str, &str)]) -> (TempDir, Vec<PathBuf>) {
    let temp_dir = TempDir::new().expect("create temp dir");
    let paths = files
        .iter()
        .map(|(name, content)| {
            let path = temp_dir.path().join(name);
            std::fs::write(&path, content).expect("write fixture");
            path
        })
        .collect();
    (temp_dir, paths)
}
