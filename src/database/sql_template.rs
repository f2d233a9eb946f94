//! `{placeholder}` substitution for stage SQL scripts.
//!
//! Values are spliced in verbatim. Schema names, table names and the normalized country
//! are restricted to plain identifiers when parameters are bound, and building ids are
//! integers, so nothing user-controlled reaches the script unchecked.

use crate::orchestration::stage::StageParameters;

/// Replace every `{name}` occurrence with its value; unknown placeholders are left as is
pub fn render<'a, I>(template: &str, values: I) -> String
where
    I: IntoIterator<Item = (&'a str, String)>,
{
    values
        .into_iter()
        .fold(template.to_string(), |sql, (name, value)| {
            sql.replace(&format!("{{{name}}}"), &value)
        })
}

/// Render a stage script with a pipeline's parameters
pub fn render_stage(template: &str, params: &StageParameters) -> String {
    render(template, params.template_values())
}
