//! String template rendering utilities.

pub struct TemplateVars;

impl TemplateVars {
    pub const DATASET: &'static str = "dataset";
    pub const BRANCH: &'static str = "branch";
    pub const PREFIX: &'static str = "prefix";
    pub const ENV_NAME: &'static str = "env_name";
    pub const DATA_DIR: &'static str = "data_dir";
    pub const WORKDIR: &'static str = "workdir";
}

pub fn render(template: &str, variables: &[(&str, &str)]) -> String {
    let mut result = template.to_string();

    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }

    result
}

pub fn is_present(template: &str, key: &str) -> bool {
    let placeholder = format!("{{{{{}}}}}", key);
    template.contains(&placeholder)
}
