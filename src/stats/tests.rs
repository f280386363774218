use super::aggregate::ContributorRow;
use super::*;
use crate::error::StatsError;
use crate::identity::{default_aliases, AliasTable};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + chrono::Duration::days(d as i64)
}

fn key(name: &str) -> ContributorKey {
    ContributorKey::from(name)
}

fn since() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
}

fn repo_table(repo: &str, rows: Vec<(&str, ContributorRecord)>) -> RepoTable {
    RepoTable {
        repo: repo.to_string(),
        since: since(),
        github: Some(RepoSummary::default()),
        rows: rows
            .into_iter()
            .map(|(name, record)| ContributorRow {
                key: key(name),
                record,
            })
            .collect(),
    }
}

fn record_with_total(total: u64) -> ContributorRecord {
    ContributorRecord {
        comments: total,
        ..Default::default()
    }
}

#[test]
fn total_formula() {
    let record = ContributorRecord {
        issues: 2,
        comments: 3,
        prs_submitted: 1,
        prs_merged: 1,
        pr_comments: 4,
        commits: 100,
        comment_words: 50,
        ..Default::default()
    };
    assert_eq!(record.total(), 11);
}

#[test]
fn aggregate_subtracts_pull_requests_from_issues() {
    let mut stats = RepoStats::new("aw-core", since());
    stats.issues_raw.add(key("ErikBjare"), 5);
    stats.prs_submitted.add(key("ErikBjare"), 2);
    stats.prs_merged.add(key("ErikBjare"), 2);
    stats.comments.add(key("xylix"), 4);
    stats.active_days.insert(key("xylix"), day(3));

    let table = aggregate(&stats).unwrap();

    let erik = table.get(&key("ErikBjare")).unwrap();
    assert_eq!(erik.issues, 3);
    assert_eq!(erik.total(), 3 + 2 + 2);
    let xylix = table.get(&key("xylix")).unwrap();
    assert_eq!(xylix.issues, 0);
    assert_eq!(xylix.active_day_count(), 1);
    assert_eq!(table.rows[0].key, key("ErikBjare"));
}

#[test]
fn aggregate_rejects_more_pull_requests_than_issues() {
    let mut stats = RepoStats::new("aw-webui", since());
    stats.issues_raw.add(key("someone"), 1);
    stats.prs_submitted.add(key("someone"), 2);

    match aggregate(&stats) {
        Err(StatsError::DataIntegrity {
            repo,
            contributor,
            issues,
            pull_requests,
        }) => {
            assert_eq!(repo, "aw-webui");
            assert_eq!(contributor, "someone");
            assert_eq!((issues, pull_requests), (1, 2));
        }
        other => panic!("expected a data integrity fault, got {:?}", other),
    }
}

#[test]
fn aggregate_keeps_discovery_order_for_ties() {
    let mut stats = RepoStats::new("docs", since());
    stats.comments.add(key("b"), 1);
    stats.comments.add(key("a"), 1);
    stats.pr_comments.add(key("c"), 1);

    let first = aggregate(&stats).unwrap();
    let second = aggregate(&stats).unwrap();

    let names: Vec<_> = first.rows.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(first, second);
}

#[test]
fn aliases_resolve_before_aggregation() {
    let aliases = AliasTable::new(&default_aliases()).unwrap();
    let mut stats = RepoStats::new("activitywatch", since());
    // The issue is filed under the login, the pull request under the name.
    stats.issues_raw.add(key("johan-bjareholt"), 1);
    stats.prs_submitted.add(key("Johan Bjäreholt"), 1);
    stats.commits.add(key("johan-bjareholt"), 3);
    stats.commits.add(key("Johan Bjäreholt"), 5);

    stats.resolve_aliases(&aliases);
    let table = aggregate(&stats).unwrap();

    assert_eq!(table.rows.len(), 1);
    let johan = table.get(&key("Johan Bjäreholt")).unwrap();
    assert_eq!(johan.commits, 8);
    assert_eq!(johan.issues, 0);
}

#[test]
fn merge_does_not_mutate_sources() {
    let a = repo_table("a", vec![("x", record_with_total(3))]);
    let b = repo_table("b", vec![("x", record_with_total(4))]);
    let (a_before, b_before) = (a.clone(), b.clone());

    let merged = merge_tables(&[a.clone(), b.clone()]);

    assert_eq!(merged.get(&key("x")).unwrap().total(), 7);
    assert_eq!(merged.repos, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(a, a_before);
    assert_eq!(b, b_before);
}

#[test]
fn merge_of_nothing_is_empty() {
    assert!(merge_tables(&[]).is_empty());
}

#[test]
fn display_projection_is_repeatable() {
    let days = ContributorRecord {
        comments: 20,
        active_days: [day(1), day(2)].into_iter().collect(),
        ..Default::default()
    };
    let merged = merge_tables(&[
        repo_table("a", vec![("x", days.clone())]),
        repo_table("b", vec![("x", days)]),
    ]);

    let first = merged.display(&DisplayOptions::default());
    let second = merged.display(&DisplayOptions::default());

    assert_eq!(first, second);
    assert_eq!(first[0].active_days, 2);
    assert_eq!(merged.get(&key("x")).unwrap().active_days.len(), 2);
}

#[test]
fn bots_never_displayed() {
    let table = repo_table(
        "a",
        vec![
            ("dependabot[bot]", record_with_total(1000)),
            ("ErikBjare", record_with_total(12)),
        ],
    );
    let merged = merge_tables(&[table]);

    let rows = merged.display(&DisplayOptions::default());

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "ErikBjare");
}

#[test]
fn threshold_is_strictly_greater_than() {
    let table = repo_table(
        "a",
        vec![("ten", record_with_total(10)), ("eleven", record_with_total(11))],
    );
    let options = DisplayOptions {
        min_total: Some(10),
        ..Default::default()
    };

    let rows = merge_tables(&[table]).display(&options);

    let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["eleven"]);
}

#[test]
fn display_order_and_row_limit() {
    let table = repo_table(
        "a",
        vec![
            ("low", record_with_total(1)),
            ("high", record_with_total(30)),
            ("mid", record_with_total(15)),
        ],
    );
    let merged = merge_tables(&[table]);

    let descending = merged.display(&DisplayOptions {
        max_rows: Some(2),
        ..Default::default()
    });
    let ascending = merged.display(&DisplayOptions {
        max_rows: Some(2),
        ascending: true,
        ..Default::default()
    });

    let names = |rows: &[DisplayRow]| rows.iter().map(|r| r.name.clone()).collect::<Vec<_>>();
    assert_eq!(names(&descending), vec!["high", "mid"]);
    assert_eq!(names(&ascending), vec!["mid", "high"]);
}

#[test]
fn blame_percent_over_whole_table() {
    let table = repo_table(
        "a",
        vec![
            (
                "one",
                ContributorRecord {
                    blame_lines: 75,
                    ..Default::default()
                },
            ),
            (
                "two[bot]",
                ContributorRecord {
                    blame_lines: 25,
                    ..Default::default()
                },
            ),
        ],
    );

    let rows = table.display(&DisplayOptions::default());

    assert_eq!(rows.len(), 1);
    assert!((rows[0].blame_percent - 75.0).abs() < f64::EPSILON);
}

fn git_only_table(repo: &str, rows: Vec<(&str, ContributorRecord)>) -> RepoTable {
    RepoTable {
        github: None,
        ..repo_table(repo, rows)
    }
}

fn history(days: u32, commits: u64, lines_added: u64) -> ContributorRecord {
    ContributorRecord {
        commits,
        lines_added,
        active_days: (0..days).map(day).collect(),
        ..Default::default()
    }
}

#[test]
fn git_only_tables_rank_by_history_without_threshold() {
    let table = git_only_table(
        "aw-watcher-afk",
        vec![
            ("a", history(2, 1, 0)),
            ("b", history(2, 5, 0)),
            ("c", history(3, 0, 0)),
            ("d", history(2, 5, 10)),
        ],
    );
    let options = DisplayOptions {
        min_total: Some(10),
        ..Default::default()
    };

    let rows = table.display(&options);

    let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["c", "d", "b", "a"]);
}

#[test]
fn summaries_fold_over_github_tables_only() {
    let mut with_github = repo_table("aw-core", vec![("x", record_with_total(1))]);
    with_github.github = Some(RepoSummary {
        open_issues: 2,
        closed_issues: 3,
        pull_requests: 4,
    });
    let git_only = git_only_table("aw-watcher-afk", vec![("x", history(1, 1, 1))]);

    let merged = merge_tables(&[git_only.clone(), with_github.clone(), with_github]);

    assert_eq!(
        merged.github,
        Some(RepoSummary {
            open_issues: 4,
            closed_issues: 6,
            pull_requests: 8,
        })
    );
    assert_eq!(merge_tables(&[git_only]).github, None);
}

#[test]
fn failed_repositories_are_missing_and_the_rest_still_fold() {
    let aliases = AliasTable::new(&default_aliases()).unwrap();

    let mut core = RepoStats::new("aw-core", since());
    core.github = Some(RepoSummary::default());
    core.issues_raw.add(key("johan-bjareholt"), 20);
    core.commits.add(key("Johan Bjäreholt"), 3);
    let mut webui = RepoStats::new("aw-webui", since());
    webui.github = Some(RepoSummary::default());
    webui.issues_raw.add(key("xylix"), 1);
    webui.prs_submitted.add(key("xylix"), 2);
    let mut server = RepoStats::new("aw-server", since());
    server.github = Some(RepoSummary::default());
    server.comments.add(key("xylix"), 11);

    let results = vec![
        ("aw-core".to_string(), Ok(core)),
        ("aw-webui".to_string(), Ok(webui)),
        (
            "aw-qt".to_string(),
            Err(StatsError::git("aw-qt", git2::Error::from_str("clone vanished"))),
        ),
        ("aw-server".to_string(), Ok(server)),
    ];

    let (total, tables) = build_aggregate(results, &aliases);

    let repos: Vec<_> = tables.iter().map(|t| t.repo.as_str()).collect();
    assert_eq!(repos, vec!["aw-core", "aw-server"]);
    assert_eq!(total.repos, vec!["aw-core".to_string(), "aw-server".to_string()]);
    let missing: Vec<_> = total.missing.iter().map(|m| m.repo.as_str()).collect();
    assert_eq!(missing, vec!["aw-webui", "aw-qt"]);
    assert!(total.missing[0].reason.contains("xylix"));

    let johan = total.get(&key("Johan Bjäreholt")).unwrap();
    assert_eq!((johan.issues, johan.commits), (20, 3));
    assert_eq!(total.get(&key("xylix")).unwrap().comments, 11);
    assert!(total.get(&key("johan-bjareholt")).is_none());
}

#[test]
fn nothing_collected_leaves_an_empty_aggregate() {
    let aliases = AliasTable::new(&[]).unwrap();
    let results = vec![(
        "aw-qt".to_string(),
        Err(StatsError::git("aw-qt", git2::Error::from_str("missing"))),
    )];

    let (total, tables) = build_aggregate(results, &aliases);

    assert!(tables.is_empty());
    assert!(total.is_empty());
    assert_eq!(total.missing.len(), 1);
}

fn arb_record() -> impl Strategy<Value = ContributorRecord> {
    (
        prop::array::uniform8(0u64..1_000),
        prop::array::uniform4(0u64..1_000),
        prop::collection::btree_set(0u32..60, 0..8),
    )
        .prop_map(|(a, b, days)| ContributorRecord {
            issues: a[0],
            comments: a[1],
            comment_words: a[2],
            reactions_given: a[3],
            reactions_received: a[4],
            prs_submitted: a[5],
            prs_merged: a[6],
            pr_comments: a[7],
            commits: b[0],
            lines_added: b[1],
            lines_removed: b[2],
            blame_lines: b[3],
            active_days: days.into_iter().map(day).collect(),
        })
}

fn arb_table(repo: &'static str) -> impl Strategy<Value = RepoTable> {
    prop::collection::btree_map(
        prop::sample::select(vec!["erik", "johan", "xylix", "nikana", "brayo"]),
        arb_record(),
        0..5,
    )
    .prop_map(move |records| repo_table(repo, records.into_iter().collect()))
}

fn summary(table: &AggregateTable) -> Vec<(ContributorKey, ContributorRecord)> {
    table
        .records
        .iter()
        .map(|(k, r)| (k.clone(), r.clone()))
        .collect()
}

proptest! {
    #[test]
    fn merge_is_commutative(a in arb_record(), b in arb_record()) {
        let ab = a.clone().merged(b.clone());
        let ba = b.merged(a);
        prop_assert_eq!(ab, ba);
    }

    #[test]
    fn day_set_union_is_idempotent(days in prop::collection::btree_set(0u32..365, 0..20)) {
        let set: BTreeSet<NaiveDate> = days.into_iter().map(day).collect();
        prop_assert_eq!(set.clone().merged(set.clone()), set);
    }

    #[test]
    fn fold_order_does_not_matter(a in arb_table("a"), b in arb_table("b"), c in arb_table("c")) {
        let abc = merge_tables(&[a.clone(), b.clone(), c.clone()]);
        let cab = merge_tables(&[c.clone(), a.clone(), b.clone()]);
        let bca = merge_tables(&[b, c, a]);
        prop_assert_eq!(summary(&abc), summary(&cab));
        prop_assert_eq!(summary(&abc), summary(&bca));
    }

    #[test]
    fn net_issues_never_negative(issues in 0u64..50, prs in 0u64..50) {
        let mut stats = RepoStats::new("repo", since());
        stats.issues_raw.add(key("x"), issues);
        stats.prs_submitted.add(key("x"), prs);
        match aggregate(&stats) {
            Ok(table) => {
                prop_assert!(issues >= prs);
                prop_assert_eq!(table.get(&key("x")).unwrap().issues, issues - prs);
            }
            Err(StatsError::DataIntegrity { .. }) => prop_assert!(issues < prs),
            Err(other) => prop_assert!(false, "unexpected error {}", other),
        }
    }
}
