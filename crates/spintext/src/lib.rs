//! Spintext templates: `{option1|option2}` variation groups and `{{variable}}`
//! placeholders, parsed once and rendered per recipient.

pub mod parser;
pub mod renderer;
pub mod template;

pub use parser::parse;
pub use renderer::{
    render, render_report, render_with, ChoiceStrategy, Chooser, LookupMiss, RenderContext,
    Rendered, Renderer, RngChooser, StrategyChooser,
};
pub use template::{Segment, Template};
