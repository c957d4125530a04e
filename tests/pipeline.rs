//! End-to-end pipeline tests: ingest meets, snapshot, and run the
//! statistics over the committed data.

use xc_stats::compare::compare_courses;
use xc_stats::conversions::{build_conversions, ConversionParams};
use xc_stats::predict::predict_times;
use xc_stats::scraper::{parse_results_page, Gender};
use xc_stats::storage::{MeetResults, MeetRow, MeetStore};
use xc_stats::virtual_race::compose_virtual_race;

fn row(place: usize, name: &str, school: &str, raw_time: String) -> MeetRow {
    MeetRow {
        place: place.to_string(),
        name: name.to_string(),
        eligibility: "JR-3".to_string(),
        school: school.to_string(),
        raw_time,
    }
}

/// Three meets:
/// - A: twenty State runners
/// - B: the same twenty plus sixteen Tech runners
/// - C: only the sixteen Tech runners, plus one single-race Ivy runner
///
/// So B compares directly to A (20 common), while C shares nobody with A
/// and must resolve through B (16 common).
fn load_fixture(store: &mut MeetStore) -> (i64, i64, i64) {
    let mut rows_a = Vec::new();
    let mut rows_b = Vec::new();
    let mut rows_c = Vec::new();

    for i in 0..20 {
        let name = format!("State Runner {}", i);
        rows_a.push(row(i + 1, &name, "State", format!("20:{:02}.0", i)));
        rows_b.push(row(i + 1, &name, "State", format!("21:{:02}.0", i)));
    }
    for j in 0..16 {
        let name = format!("Tech Runner {}", j);
        rows_b.push(row(21 + j, &name, "Tech", format!("21:{:02}.5", 20 + j)));
        rows_c.push(row(j + 1, &name, "Tech", format!("22:{:02}.5", 20 + j)));
    }
    rows_c.push(row(17, "Ivy Runner", "Ivy", "23:00.0".to_string()));

    let meet_a = MeetResults {
        course: "Panorama Farms Invitational".to_string(),
        date: "Sep 6, 2025".to_string(),
        rows: rows_a,
    };
    let meet_b = MeetResults {
        course: "Louisville Classic".to_string(),
        date: "Oct 4, 2025".to_string(),
        rows: rows_b,
    };
    let meet_c = MeetResults {
        course: "Hilltop Open".to_string(),
        date: "Oct 18, 2025".to_string(),
        rows: rows_c,
    };

    let a = store.ingest(&meet_a).unwrap().race_id;
    let b = store.ingest(&meet_b).unwrap().race_id;
    let c = store.ingest(&meet_c).unwrap().race_id;
    (a, b, c)
}

#[test]
fn ingest_assigns_stable_identities() {
    let mut store = MeetStore::open_in_memory().unwrap();
    let (a, b, c) = load_fixture(&mut store);

    assert_ne!(a, b);
    assert_ne!(b, c);
    // same (name, eligibility, school) triple resolves to one runner
    let id = store
        .runner_id("State Runner 0", "JR-3", "State")
        .unwrap();
    let snap = store.snapshot().unwrap();
    assert_eq!(snap.runner_times(id).unwrap().len(), 2);
}

#[test]
fn reingesting_a_meet_changes_nothing() {
    let mut store = MeetStore::open_in_memory().unwrap();
    let (a, _, _) = load_fixture(&mut store);
    let before = store.snapshot().unwrap();
    let mean_before: f64 = {
        let times = before.race_times(a).unwrap();
        times.values().sum::<f64>() / times.len() as f64
    };

    let mut rows = Vec::new();
    for i in 0..20 {
        let name = format!("State Runner {}", i);
        rows.push(row(i + 1, &name, "State", format!("20:{:02}.0", i)));
    }
    let again = MeetResults {
        course: "Panorama Farms Invitational".to_string(),
        date: "Sep 6, 2025".to_string(),
        rows,
    };
    let summary = store.ingest(&again).unwrap();

    assert_eq!(summary.race_id, a);
    assert_eq!(summary.inserted, 0);
    assert_eq!(summary.duplicates, 20);

    let after = store.snapshot().unwrap();
    assert_eq!(after.result_count(), before.result_count());
    let mean_after: f64 = {
        let times = after.race_times(a).unwrap();
        times.values().sum::<f64>() / times.len() as f64
    };
    assert_eq!(mean_before, mean_after);
}

#[test]
fn conversions_resolve_direct_and_chained_courses() {
    let mut store = MeetStore::open_in_memory().unwrap();
    let (a, b, c) = load_fixture(&mut store);
    let snap = store.snapshot().unwrap();

    assert_eq!(compare_courses(&snap, a, b).unwrap().num_compared, 20);
    assert_eq!(compare_courses(&snap, a, c).unwrap().num_compared, 0);
    assert_eq!(compare_courses(&snap, b, c).unwrap().num_compared, 16);

    let table = build_conversions(&snap, a, &ConversionParams::default()).unwrap();
    let conversion = |race_id: i64| {
        table
            .courses
            .iter()
            .find(|row| row.race_id == race_id)
            .unwrap()
            .clone()
    };

    // the primary is the fixed point
    assert_eq!(conversion(a).ratio_conversion, Some(1.0));
    assert_eq!(conversion(a).time_conversion, Some(0.0));

    // B resolves directly from its pairwise comparison
    let direct = compare_courses(&snap, a, b).unwrap();
    assert_eq!(conversion(b).ratio_conversion, direct.ratio);
    assert_eq!(conversion(b).time_conversion, direct.difference);
    assert!((direct.difference.unwrap() - 60.0).abs() < 1e-9);

    // C chains through B alone, with full weight
    let b_to_c = compare_courses(&snap, b, c).unwrap();
    let expected_ratio = b_to_c.ratio.unwrap() * direct.ratio.unwrap();
    let expected_time = b_to_c.difference.unwrap() + direct.difference.unwrap();
    assert!((conversion(c).ratio_conversion.unwrap() - expected_ratio).abs() < 1e-12);
    assert!((conversion(c).time_conversion.unwrap() - expected_time).abs() < 1e-9);

    assert!(table.unusable.is_empty());
}

#[test]
fn predictions_cover_exactly_the_multi_race_runners() {
    let mut store = MeetStore::open_in_memory().unwrap();
    let (a, _, _) = load_fixture(&mut store);
    let snap = store.snapshot().unwrap();

    let predictions = predict_times(&snap, a).unwrap();

    // 36 multi-race runners; the Ivy runner raced once and is excluded
    assert_eq!(predictions.len(), 36);
    assert!(predictions.iter().all(|p| p.name != "Ivy Runner"));
    assert!(predictions.iter().all(|p| p.predicted_time > 0.0));
    // "M:SS" formatting
    for prediction in &predictions {
        let (minutes, seconds) = prediction.formatted_time.split_once(':').unwrap();
        assert!(minutes.parse::<u32>().is_ok());
        assert_eq!(seconds.len(), 2);
        assert!(seconds.parse::<u32>().is_ok());
    }
}

#[test]
fn virtual_race_ranks_both_schools() {
    let mut store = MeetStore::open_in_memory().unwrap();
    let (a, _, _) = load_fixture(&mut store);
    let snap = store.snapshot().unwrap();

    let schools = vec!["State".to_string(), "Tech".to_string()];
    let race = compose_virtual_race(&snap, &schools, a, &ConversionParams::default()).unwrap();

    assert_eq!(race.len(), 36);
    assert_eq!(race[0].name, "State Runner 0");
    assert_eq!(race[0].place, 1);
    for window in race.windows(2) {
        assert!(window[0].average_time <= window[1].average_time);
    }
    assert!(race.iter().any(|entry| entry.school == "Tech"));
    assert!(race.iter().all(|entry| entry.school != "Ivy"));
}

#[test]
fn scraped_page_flows_into_the_store() {
    const PAGE: &str = r#"<html><body>
<div class="panel-heading-normal-text inline-block">Sep 20, 2025</div>
<div class="custom-table-title custom-table-title-xc">
    <h3 class="font-weight-500">Women's 5k Individual Results</h3>
</div>
<table>
  <tr><th>PL</th><th>NAME</th><th>YEAR</th><th>TEAM</th><th>TIME</th></tr>
  <tr><td>1</td><td>Ada Hill</td><td>JR-3</td><td>State</td><td>17:45.2</td></tr>
  <tr><td>2</td><td>Bea Frost</td><td>SO-2</td><td>Tech</td><td>18:01.9</td></tr>
</table>
</body></html>"#;

    let meet =
        parse_results_page(PAGE, "Riverside Twilight", Gender::Women, true, true).unwrap();
    assert_eq!(meet.date, "Sep 20, 2025");

    let mut store = MeetStore::open_in_memory().unwrap();
    let summary = store.ingest(&meet).unwrap();
    assert_eq!(summary.inserted, 2);

    let snap = store.snapshot().unwrap();
    let times = snap.race_times(summary.race_id).unwrap();
    assert_eq!(times.len(), 2);
    assert!(times.values().any(|&t| t == 17.0 * 60.0 + 45.2));
}
