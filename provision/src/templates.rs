use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;

/// Render one configuration file template
///
/// Missing variables are errors; nothing is escaped.
pub(crate) fn render<S: Serialize>(
    name: &'static str,
    source: &'static str,
    context: &S,
) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.set_trim_blocks(true);
    env.set_keep_trailing_newline(true);
    env.add_template(name, source)?;
    env.get_template(name)?.render(context)
}
