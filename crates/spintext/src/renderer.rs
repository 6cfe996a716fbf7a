//! Turns a parsed template into a concrete message for one recipient.

use std::collections::HashMap;

use campaign_core::MissingVariablePolicy;
use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::template::{Segment, Template};

/// Picks one option index out of `options` (always at least 1).
pub trait Chooser {
    fn choose(&mut self, options: usize) -> usize;
}

/// How variation groups are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceStrategy {
    /// Always the first option. Used for live previews.
    FirstChoice,
    /// Uniform pick. `None` draws from process entropy so recipients of the
    /// same campaign get different phrasings.
    Random { seed: Option<u64> },
    /// The option at this index in every group, clamped to the last option.
    Fixed(usize),
}

impl ChoiceStrategy {
    pub fn seeded(seed: u64) -> Self {
        Self::Random { seed: Some(seed) }
    }

    pub fn unseeded() -> Self {
        Self::Random { seed: None }
    }

    /// A fresh chooser; seeded strategies restart their sequence on every call.
    pub fn chooser(&self) -> StrategyChooser {
        match *self {
            Self::FirstChoice => StrategyChooser::Fixed(0),
            Self::Fixed(index) => StrategyChooser::Fixed(index),
            Self::Random { seed: Some(seed) } => {
                StrategyChooser::Seeded(RngChooser(StdRng::seed_from_u64(seed)))
            }
            Self::Random { seed: None } => StrategyChooser::Entropy(RngChooser(rand::thread_rng())),
        }
    }
}

/// Uniform choice driven by any RNG.
#[derive(Debug, Clone)]
pub struct RngChooser<R>(pub R);

impl<R: RngCore> Chooser for RngChooser<R> {
    fn choose(&mut self, options: usize) -> usize {
        if options <= 1 {
            return 0;
        }
        self.0.gen_range(0..options)
    }
}

/// Chooser built from a [`ChoiceStrategy`].
#[derive(Debug)]
pub enum StrategyChooser {
    Fixed(usize),
    Seeded(RngChooser<StdRng>),
    Entropy(RngChooser<ThreadRng>),
}

impl Chooser for StrategyChooser {
    fn choose(&mut self, options: usize) -> usize {
        match self {
            Self::Fixed(index) => (*index).min(options.saturating_sub(1)),
            Self::Seeded(rng) => rng.choose(options),
            Self::Entropy(rng) => rng.choose(options),
        }
    }
}

/// A `{{name}}` with no binding. Recoverable: rendered per the missing-variable policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupMiss {
    pub name: String,
}

/// Output of a render plus the variables that had no binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendered {
    pub text: String,
    pub misses: Vec<LookupMiss>,
}

/// Per-recipient bindings and the choice strategy to render with.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub variables: HashMap<String, String>,
    pub strategy: ChoiceStrategy,
    pub missing: MissingVariablePolicy,
}

impl RenderContext {
    pub fn new(strategy: ChoiceStrategy) -> Self {
        Self {
            variables: HashMap::new(),
            strategy,
            missing: MissingVariablePolicy::default(),
        }
    }

    /// First-choice context for the editor preview.
    pub fn preview() -> Self {
        Self::new(ChoiceStrategy::FirstChoice)
    }

    /// Unseeded random context used at send time.
    pub fn send() -> Self {
        Self::new(ChoiceStrategy::unseeded())
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_variables<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.variables
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_missing_policy(mut self, missing: MissingVariablePolicy) -> Self {
        self.missing = missing;
        self
    }
}

/// Render `template` for one recipient.
pub fn render(template: &Template, context: &RenderContext) -> String {
    render_report(template, context).text
}

/// Like [`render`], also reporting unbound variables.
pub fn render_report(template: &Template, context: &RenderContext) -> Rendered {
    let mut chooser = context.strategy.chooser();
    render_with(template, &context.variables, context.missing, &mut chooser)
}

/// Render with a caller-owned chooser, so a send loop can share one RNG
/// across many recipients.
pub fn render_with(
    template: &Template,
    variables: &HashMap<String, String>,
    missing: MissingVariablePolicy,
    chooser: &mut dyn Chooser,
) -> Rendered {
    let mut out = Rendered {
        text: String::new(),
        misses: Vec::new(),
    };
    render_into(template, variables, missing, chooser, &mut out);
    if !out.misses.is_empty() {
        debug!(misses = out.misses.len(), "rendered with unbound variables");
    }
    out
}

fn render_into(
    template: &Template,
    variables: &HashMap<String, String>,
    missing: MissingVariablePolicy,
    chooser: &mut dyn Chooser,
    out: &mut Rendered,
) {
    for segment in &template.segments {
        match segment {
            Segment::Literal(text) => out.text.push_str(text),
            Segment::Variable(name) => match variables.get(name) {
                Some(value) => out.text.push_str(value),
                None => {
                    if missing == MissingVariablePolicy::Keep {
                        out.text.push_str("{{");
                        out.text.push_str(name);
                        out.text.push_str("}}");
                    }
                    if !out.misses.iter().any(|m| &m.name == name) {
                        out.misses.push(LookupMiss { name: name.clone() });
                    }
                }
            },
            Segment::Variation(options) => {
                if options.is_empty() {
                    continue;
                }
                let index = chooser.choose(options.len()).min(options.len() - 1);
                render_into(&options[index], variables, missing, chooser, out);
            }
        }
    }
}

/// A parsed template bound to a missing-variable policy, for bulk sends.
#[derive(Debug, Clone)]
pub struct Renderer {
    template: Template,
    missing: MissingVariablePolicy,
}

impl Renderer {
    pub fn new(template: Template, missing: MissingVariablePolicy) -> Self {
        Self { template, missing }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn render_one(&self, variables: &HashMap<String, String>, chooser: &mut dyn Chooser) -> Rendered {
        render_with(&self.template, variables, self.missing, chooser)
    }

    /// One message per recipient, in recipient order, drawing every choice from `chooser`.
    pub fn render_many<'a, I>(&self, recipients: I, chooser: &mut dyn Chooser) -> Vec<Rendered>
    where
        I: IntoIterator<Item = &'a HashMap<String, String>>,
    {
        recipients
            .into_iter()
            .map(|vars| self.render_one(vars, chooser))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn ana() -> RenderContext {
        RenderContext::preview().with_variable("nome", "Ana")
    }

    #[test]
    fn test_first_choice() {
        let t = parse("{a|b|c}").unwrap();
        assert_eq!(render(&t, &RenderContext::preview()), "a");
    }

    #[test]
    fn test_variable_substitution() {
        let t = parse("Hi {{nome}}").unwrap();
        assert_eq!(render(&t, &ana()), "Hi Ana");
    }

    #[test]
    fn test_static_template_renders_unchanged() {
        let src = "Hoje tem feijoada às 12h | reserve já!";
        let t = parse(src).unwrap();
        for strategy in [ChoiceStrategy::FirstChoice, ChoiceStrategy::unseeded()] {
            assert_eq!(render(&t, &RenderContext::new(strategy)), src);
        }
    }

    #[test]
    fn test_preview_is_stable() {
        let t = parse("{Oi|Fala|E aí} {{nome}}, hoje tem {feijoada|baião de dois|torta de frango}!")
            .unwrap();
        let ctx = RenderContext::preview().with_variable("nome", "João");
        let first = render(&t, &ctx);
        assert_eq!(first, "Oi João, hoje tem feijoada!");
        for _ in 0..10 {
            assert_eq!(render(&t, &ctx), first);
        }
    }

    #[test]
    fn test_seeded_random_is_reproducible() {
        let t = parse("{Hi|Hey} {{nome}}").unwrap();
        for seed in 0..50u64 {
            let ctx = RenderContext::new(ChoiceStrategy::seeded(seed)).with_variable("nome", "Ana");
            let a = render(&t, &ctx);
            let b = render(&t, &ctx);
            assert_eq!(a, b, "seed {seed}");
            assert!(a == "Hi Ana" || a == "Hey Ana", "unexpected output {a:?}");
        }
    }

    #[test]
    fn test_seeded_random_reaches_every_option() {
        let t = parse("{a|b|c}").unwrap();
        let seen: std::collections::HashSet<String> = (0..200u64)
            .map(|seed| render(&t, &RenderContext::new(ChoiceStrategy::seeded(seed))))
            .collect();
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_unseeded_random_stays_within_options() {
        let t = parse("{Hi|Hey} {{nome}}").unwrap();
        let ctx = RenderContext::send().with_variable("nome", "Ana");
        for _ in 0..100 {
            let out = render(&t, &ctx);
            assert!(out == "Hi Ana" || out == "Hey Ana", "unexpected output {out:?}");
        }
    }

    #[test]
    fn test_nested_groups() {
        let t = parse("{a|{b|c}}").unwrap();
        assert_eq!(render(&t, &RenderContext::preview()), "a");
        assert_eq!(render(&t, &RenderContext::new(ChoiceStrategy::Fixed(1))), "c");
        // Out-of-range indices clamp to the last option at each level.
        assert_eq!(render(&t, &RenderContext::new(ChoiceStrategy::Fixed(7))), "c");
    }

    #[test]
    fn test_group_whose_first_option_is_a_variable() {
        let t = parse("{{{nome}}|amigo}, tudo bem?").unwrap();
        assert_eq!(render(&t, &ana()), "Ana, tudo bem?");
        assert_eq!(
            render(&t, &RenderContext::new(ChoiceStrategy::Fixed(1)).with_variable("nome", "Ana")),
            "amigo, tudo bem?"
        );

        let t = parse("{{{nome}}}").unwrap();
        assert_eq!(render(&t, &ana()), "Ana");
    }

    #[test]
    fn test_empty_option_renders_empty() {
        let t = parse("x{|foo}y").unwrap();
        assert_eq!(render(&t, &RenderContext::preview()), "xy");
        assert_eq!(render(&t, &RenderContext::new(ChoiceStrategy::Fixed(1))), "xfooy");
    }

    #[test]
    fn test_missing_variable_policies() {
        let t = parse("Oi {{nome}}, {{nome}} e {{sobrenome}}!").unwrap();

        let report = render_report(&t, &RenderContext::preview());
        assert_eq!(report.text, "Oi ,  e !");
        assert_eq!(
            report.misses,
            vec![
                LookupMiss { name: "nome".into() },
                LookupMiss { name: "sobrenome".into() },
            ]
        );

        let keep = RenderContext::preview()
            .with_variable("nome", "Ana")
            .with_missing_policy(MissingVariablePolicy::Keep);
        let report = render_report(&t, &keep);
        assert_eq!(report.text, "Oi Ana, Ana e {{sobrenome}}!");
        assert_eq!(report.misses.len(), 1);
    }

    #[test]
    fn test_variables_inside_chosen_option_only() {
        let t = parse("{Oi {{nome}}|Olá}").unwrap();
        let report = render_report(&t, &RenderContext::new(ChoiceStrategy::Fixed(1)));
        assert_eq!(report.text, "Olá");
        assert!(report.misses.is_empty());
    }

    #[test]
    fn test_render_many_shares_one_chooser() {
        let renderer = Renderer::new(parse("{A|B} {{nome}}").unwrap(), MissingVariablePolicy::Empty);
        let recipients: Vec<HashMap<String, String>> = ["Ana", "Bia", "Caio"]
            .iter()
            .map(|n| HashMap::from([("nome".to_string(), n.to_string())]))
            .collect();

        let mut first = ChoiceStrategy::seeded(7).chooser();
        let a: Vec<String> = renderer
            .render_many(&recipients, &mut first)
            .into_iter()
            .map(|r| r.text)
            .collect();
        let mut again = ChoiceStrategy::seeded(7).chooser();
        let b: Vec<String> = renderer
            .render_many(&recipients, &mut again)
            .into_iter()
            .map(|r| r.text)
            .collect();

        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert!(a[1].ends_with(" Bia"));
    }
}
