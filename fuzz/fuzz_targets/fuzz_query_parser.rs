#![no_main]

use dtsyntax::query;
use dtsyntax::utils::AnalyzerConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Every analysis entry point must accept arbitrary text without panicking
    let _ = query::tokenize(data, 0);
    let _ = query::build_query_trees(data);
    let _ = query::analyze_flow(data);
    let _ = query::validate(data);
    let _ = query::split_or_query(data);
    let _ = query::cleanup_with_report(data);
    let _ = query::highlight(data, &AnalyzerConfig::default());

    let fixes = query::suggest_fixes(data);
    let fixed = query::apply_all_fixes(data, &fixes);
    assert_eq!(query::query_paren_balance(&fixed), 0);
});
