use crate::{
    compiler::Compilation,
    diagnostics::Reporter,
    parser, resolver, type_checker,
    util::fmt::tree::{self, Overlays},
};

/// Each variant contains the input, and names the last stage to run.
pub enum Test {
    Parser(&'static str),
    Resolver(&'static str),
    Checker(&'static str),
    Codegen(&'static str),
}

pub enum Assertion {
    TreeOk(&'static str),
    TreeError(&'static str),
    CodeOk(&'static str),
    ExpectedErrors(&'static [&'static str]),
}

/// Runs the pipeline up to the test's stage, returning the decorated tree (or
/// the code listing, for codegen tests) and the formatted errors.
///
/// Like the compiler driver, a stage only runs if the previous ones reported
/// no errors.
#[track_caller]
pub fn run_pipeline(test: Test) -> (String, Vec<String>) {
    let tokens = &mut Vec::with_capacity(1024);
    let reporter = &mut Reporter::new();

    let (src, stages) = match test {
        Test::Parser(src) => (src, 1),
        Test::Resolver(src) => (src, 2),
        Test::Checker(src) => (src, 3),
        Test::Codegen(src) => {
            let compilation = Compilation::run_str(src);
            let listing = compilation.code.as_ref().map(|c| c.text()).unwrap_or_default();
            return (listing, compilation.reporter.format());
        }
    };

    let program = parser::parse_str(src, tokens, reporter);
    let resolution =
        (stages >= 2 && !reporter.has_errors()).then(|| resolver::resolve(&program, reporter));
    let types = match &resolution {
        Some(resolution) if stages >= 3 && !reporter.has_errors() => {
            Some(type_checker::check(&program, resolution, reporter))
        }
        _ => None,
    };

    let overlays = Overlays {
        resolution: resolution.as_ref(),
        types: types.as_ref(),
    };
    let tree = tree::print_program_string(&program, overlays);
    (tree, reporter.format())
}

/// Trims every line, dropping empty ones, so listings compare regardless of
/// the indentation they are written with.
fn normalize_listing(listing: &str) -> Vec<&str> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

#[track_caller]
pub fn run_assertion(
    assertion: Assertion,
    formatted_actual_tree: &str,
    formatted_actual_errors: &[String],
) {
    match assertion {
        Assertion::TreeOk(expected_tree) => {
            let expected_errors: &[&str] = &[];
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
            ::pretty_assertions::assert_eq!(formatted_actual_tree.trim(), expected_tree.trim());
        }
        Assertion::TreeError(expected_tree) => {
            ::pretty_assertions::assert_eq!(formatted_actual_tree.trim(), expected_tree.trim());
        }
        Assertion::CodeOk(expected_code) => {
            let expected_errors: &[&str] = &[];
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
            ::pretty_assertions::assert_eq!(
                normalize_listing(formatted_actual_tree),
                normalize_listing(expected_code)
            );
        }
        Assertion::ExpectedErrors(expected_errors) => {
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
        }
    }
}

macro_rules! tree_tests {
    (
        use $stage:ident;

        $(
            fn $test_name:ident() {
                let program = $source:expr;
                $($assertions_tt:tt)*
            }
        )*
    ) => {
        $(
            #[test]
            fn $test_name() {
                let test: crate::util::test_utils::Test =
                    tree_tests!(@@get_test($stage), $source);
                let (formatted_actual_tree, formatted_actual_errors) =
                    crate::util::test_utils::run_pipeline(test);
                let ctx = (&formatted_actual_tree, &formatted_actual_errors);
                tree_tests!(@@expand_assertions, ctx, [$($assertions_tt)*]);
            }
        )*
    };

    (@@expand_assertions, $ctx:expr, []) => {};
    (@@expand_assertions, $ctx:expr, [
        let $assertion:ident = $assertion_expected:expr;
        $($rest_assertions_tt:tt)*
    ]) => {
        crate::util::test_utils::run_assertion(
            tree_tests!(@@assertion, $assertion, $assertion_expected),
            $ctx.0,
            $ctx.1,
        );
        tree_tests!(@@expand_assertions, $ctx, [$($rest_assertions_tt)*]);
    };

    (@@assertion, tree_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeOk(::indoc::indoc! { $expected })
    };
    (@@assertion, tree_error, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeError(::indoc::indoc! { $expected })
    };
    (@@assertion, code_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::CodeOk($expected)
    };
    (@@assertion, expected_errors, $expected:expr) => {
        crate::util::test_utils::Assertion::ExpectedErrors($expected)
    };

    (@@get_test(parser), $source:expr) => {
        crate::util::test_utils::Test::Parser($source)
    };
    (@@get_test(resolver), $source:expr) => {
        crate::util::test_utils::Test::Resolver($source)
    };
    (@@get_test(checker), $source:expr) => {
        crate::util::test_utils::Test::Checker($source)
    };
    (@@get_test(codegen), $source:expr) => {
        crate::util::test_utils::Test::Codegen($source)
    };
}
pub(crate) use tree_tests;
