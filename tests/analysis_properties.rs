//! Property-based tests over generated Python fragments.
//!
//! These tests verify invariants that should hold for all inputs:
//! - Scores stay within 0..=100 for any flag penalty
//! - Loop-free, recursion-free, sort-free code is O(1)
//! - An extra enclosing loop never lowers the label
//! - Analysis and rewriting are deterministic
//! - Applied rewrites never overlap and always re-parse, including memoized
//!   recursion, replaced bubble sorts and collapsed counting loops
//! - Every physical line gets exactly one energy class

use energylens::complexity::ComplexityClassifier;
use energylens::pipeline::analyze;
use energylens::{find_matches, walk, AnalysisConfig, ComplexityLabel, RewriteEngine, SourceUnit};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Stmt {
    Leaf(&'static str),
    /// Multi-line fragment kept verbatim apart from indentation.
    Block(String),
    For(Vec<Stmt>),
    While(Vec<Stmt>),
}

const LEAVES: &[&str] = &[
    "pass",
    "x = 1",
    "total += v",
    "out += str(v)",
    "items.append(v)",
    "items.append(v * 2)",
    "print(v)",
    "counts[v] = counts.get(v, 0) + 1",
    "m = re.match('a+', v)",
    "if v in seen:\n    hits += 1",
    "if v in counts:\n    counts[v] += 1\nelse:\n    counts[v] = 1",
    "data.sort()",
    "ordered = sorted(data)",
];

const PRELUDE: &str =
    "import functools\nimport re\nout = ''\nitems = []\ncounts = {}\nseen = []\nhits = 0\n";

const BUBBLE_SORT: &str = "\
for i in range(len(data)):
    for j in range(len(data) - i - 1):
        if data[j] > data[j + 1]:
            data[j], data[j + 1] = data[j + 1], data[j]";

const COUNTING_LOOP: &str = "\
tally = {}
for v in data:
    if v in tally:
        tally[v] += 1
    else:
        tally[v] = 1";

fn leaf(allow_sort: bool) -> impl Strategy<Value = Stmt> {
    let leaves: Vec<&'static str> = LEAVES
        .iter()
        .copied()
        .filter(|text| allow_sort || !text.contains("sort"))
        .collect();
    prop::sample::select(leaves).prop_map(Stmt::Leaf)
}

/// A loop-free recursive function with one to three self-calls.
fn recursive_function() -> impl Strategy<Value = Stmt> {
    (
        0usize..3,
        1usize..=3,
        prop::sample::select(vec![
            "",
            "@functools.lru_cache(maxsize=None)\n",
            "@functools.cache\n",
        ]),
        any::<bool>(),
        prop::sample::select(vec!["", "print(n)\n    ", "seen.append(n)\n    ", "global hits\n    "]),
    )
        .prop_map(|(id, calls, decorator, typed, effect)| {
            let (parameter, returns) = if typed { ("n: int", " -> int") } else { ("n", "") };
            let recursion: Vec<String> = (1..=calls).map(|step| format!("rec_{id}(n - {step})")).collect();
            Stmt::Block(format!(
                "{decorator}def rec_{id}({parameter}){returns}:\n    {effect}if n < 2:\n        return n\n    return {}",
                recursion.join(" + ")
            ))
        })
}

fn stmt() -> impl Strategy<Value = Stmt> {
    let base = prop_oneof![
        6 => leaf(true),
        2 => recursive_function(),
        1 => Just(Stmt::Block(BUBBLE_SORT.to_string())),
        1 => Just(Stmt::Block(COUNTING_LOOP.to_string())),
    ];
    base.prop_recursive(3, 24, 3, |inner| {
        let body = prop::collection::vec(inner, 1..=3);
        prop_oneof![
            body.clone().prop_map(Stmt::For),
            body.prop_map(Stmt::While),
        ]
    })
}

fn program() -> impl Strategy<Value = Vec<Stmt>> {
    prop::collection::vec(stmt(), 1..=4)
}

fn render_into(stmts: &[Stmt], depth: usize, out: &mut String) {
    let indent = "    ".repeat(depth);
    for stmt in stmts {
        match stmt {
            Stmt::Leaf(text) => render_lines(text, &indent, out),
            Stmt::Block(text) => render_lines(text, &indent, out),
            Stmt::For(body) => {
                out.push_str(&format!("{indent}for v in data:\n"));
                render_into(body, depth + 1, out);
            }
            Stmt::While(body) => {
                out.push_str(&format!("{indent}while k < 10:\n"));
                render_into(body, depth + 1, out);
            }
        }
    }
}

fn render_lines(text: &str, indent: &str, out: &mut String) {
    for line in text.lines() {
        out.push_str(indent);
        out.push_str(line);
        out.push('\n');
    }
}

fn render(stmts: &[Stmt]) -> String {
    let mut out = PRELUDE.to_string();
    render_into(stmts, 0, &mut out);
    out
}

fn render_wrapped(stmts: &[Stmt]) -> String {
    let mut out = PRELUDE.to_string();
    out.push_str("for w in data:\n");
    render_into(stmts, 1, &mut out);
    out
}

fn parse(source: &str) -> SourceUnit {
    SourceUnit::parse(source).expect("generated source should parse")
}

proptest! {
    #[test]
    fn prop_score_is_bounded(stmts in program(), penalty in 0u32..=100) {
        let unit = parse(&render(&stmts));
        let classification = ComplexityClassifier::new(penalty).classify(&walk(&unit).summary);
        prop_assert!(classification.score <= 100);
    }

    #[test]
    fn prop_straight_line_code_is_constant(
        stmts in prop::collection::vec(leaf(false), 0..=8)
    ) {
        let unit = parse(&render(&stmts));
        let report = analyze(&unit, &AnalysisConfig::default()).unwrap();
        prop_assert_eq!(report.classification.label, ComplexityLabel::Constant);
    }

    #[test]
    fn prop_extra_loop_never_lowers_label(stmts in program()) {
        let config = AnalysisConfig::default();
        let plain = analyze(&parse(&render(&stmts)), &config).unwrap();
        let wrapped = analyze(&parse(&render_wrapped(&stmts)), &config).unwrap();
        prop_assert_eq!(
            wrapped.summary.max_loop_nest_depth,
            plain.summary.max_loop_nest_depth + 1
        );
        prop_assert!(wrapped.classification.label.rank() >= plain.classification.label.rank());
    }

    #[test]
    fn prop_analysis_and_rewrite_are_deterministic(stmts in program()) {
        let unit = parse(&render(&stmts));
        let first = find_matches(&walk(&unit));
        let second = find_matches(&walk(&unit));
        prop_assert_eq!(&first, &second);

        let engine = RewriteEngine::default();
        let a = engine.rewrite(&unit, &first).unwrap();
        let b = engine.rewrite(&unit, &second).unwrap();
        prop_assert_eq!(a.plan, b.plan);
        prop_assert_eq!(a.rewritten.source(), b.rewritten.source());
    }

    #[test]
    fn prop_rewrites_do_not_overlap_and_reparse(stmts in program(), annotate in any::<bool>()) {
        let unit = parse(&render(&stmts));
        let matches = find_matches(&walk(&unit));
        let outcome = RewriteEngine::new(annotate).rewrite(&unit, &matches).unwrap();

        for pair in outcome.plan.entries.windows(2) {
            prop_assert!(pair[0].original_span.end < pair[1].original_span.start);
        }
        prop_assert!(SourceUnit::parse(outcome.text()).is_ok());
    }

    #[test]
    fn prop_every_line_is_classified_once(stmts in program()) {
        let unit = parse(&render(&stmts));
        let report = analyze(&unit, &AnalysisConfig::default()).unwrap();
        let lines: Vec<usize> = report.line_energy.iter().map(|(line, _)| line).collect();
        let expected: Vec<usize> = (1..=unit.line_count()).collect();
        prop_assert_eq!(lines, expected);
    }
}

#[test]
fn test_wrapping_straight_line_code_makes_it_linear() {
    let stmts = vec![Stmt::Leaf("x = 1"), Stmt::Leaf("print(v)")];
    let report = analyze(&parse(&render_wrapped(&stmts)), &AnalysisConfig::default()).unwrap();
    assert_eq!(report.classification.label, ComplexityLabel::Linear);
}
