//! SharePoint suites run end to end against the in-memory SharePoint server

use conformance::suites::{CaseOutcome, CaseReport, Suite, run_all, run_case};
use conformance::{AdminsSuite, CopysSuite, InMemorySharePoint, TestProperties};

const SOURCE_FILE: &str = "http://sut02/sites/source/SharedDocuments/SourceFile.txt";
const SOURCE_FILE_ON_DESTINATION: &str = "http://sut01/sites/dest/SharedDocuments/SourceFile.txt";
const DESTINATION_LIBRARY: &str = "http://sut01/sites/dest/DestinationLibrary";
const MEETING_WORKSPACE_LIBRARY: &str = "http://sut01/sites/meeting/SharedDocuments";
const SOURCE_CONTENTS: &str = "Contents of the MS-COPYS source file";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn failures(reports: &[CaseReport]) -> Vec<String> {
    reports
        .iter()
        .filter_map(|report| match &report.outcome {
            CaseOutcome::Failed(reason) => Some(format!("{}: {reason}", report.name)),
            _ => None,
        })
        .collect()
}

fn outcome_of<'r>(reports: &'r [CaseReport], name: &str) -> &'r CaseOutcome {
    &reports
        .iter()
        .find(|report| report.name == name)
        .unwrap_or_else(|| panic!("no report for {name}"))
        .outcome
}

fn admins_properties() -> TestProperties {
    TestProperties::from_pairs([
        ("TransportType", "HTTP"),
        ("SutComputerName", "sut01"),
        ("UrlWithOutPort", "http://sut01/sites/"),
        ("AdminPortNumber", "8080"),
        ("InvalidPortNumber", "9999"),
        ("CustomizedTemplate", "STS#0"),
        ("OwnerLogin", "CONTOSO\\administrator"),
        ("NotInstalledLCID", "1041"),
    ])
}

fn admins_server() -> InMemorySharePoint {
    InMemorySharePoint::new("sut01")
        .with_port(8080)
        .with_owner_login("contoso\\administrator")
}

#[test]
fn test_admins_suite_passes() {
    init_logging();
    let server = admins_server();
    let mut suite = AdminsSuite::setup(&server, &server, admins_properties()).unwrap();

    let reports = run_all(&mut suite);
    assert_eq!(failures(&reports), Vec::<String>::new());
    assert!(reports.iter().all(CaseReport::passed));

    let site = suite.teardown().unwrap();
    for id in [13, 3043, 2048, 3017, 28, 1028, 17, 18002, 1022, 121, 123] {
        assert!(site.is_captured(id), "R{id} was not captured");
    }
    assert_eq!(server.site_count(), 0);
}

#[test]
fn test_admins_fault_on_installed_lcid_fails_case() {
    init_logging();
    // 1041 is installed here, so CreateSite succeeds where a fault is expected
    let server = admins_server().with_language(1041);
    let mut suite = AdminsSuite::setup(&server, &server, admins_properties()).unwrap();

    let case = AdminsSuite::cases()
        .into_iter()
        .find(|case| case.name == "S02_TC08_CreateSiteFailed_LcidNotInstalled")
        .unwrap();
    let report = run_case(&mut suite, case);
    assert!(matches!(report.outcome, CaseOutcome::Failed(_)), "{report:?}");

    // the unexpected site is removed by the case cleanup
    assert_eq!(server.site_count(), 0);
}

#[test]
fn test_admins_setup_needs_properties() {
    let server = admins_server();
    let properties = TestProperties::from_pairs([("TransportType", "http")]);
    assert!(AdminsSuite::setup(&server, &server, properties).is_err());
}

fn copys_properties() -> TestProperties {
    TestProperties::from_pairs([
        ("SourceSutComputerName", "sut02".to_string()),
        ("SourceFileUrlOnSourceSUT", SOURCE_FILE.to_string()),
        ("SourceFileUrlOnDesSUT", SOURCE_FILE_ON_DESTINATION.to_string()),
        (
            "UrlPatternOfDesFileOnDestinationSUT",
            format!("{DESTINATION_LIBRARY}/{{FileName}}"),
        ),
        (
            "UrlPatternOfDesFileForMWSOnDestinationSUT",
            format!("{MEETING_WORKSPACE_LIBRARY}/{{FileName}}"),
        ),
        ("SourceFileContents", SOURCE_CONTENTS.to_string()),
        ("MSCOPYSCheckOutUserName", "checkout".to_string()),
        ("PasswordOfCheckOutUser", "Password01!".to_string()),
        ("Domain", "contoso.com".to_string()),
        ("R1048Enabled", "true".to_string()),
    ])
}

fn copys_server() -> InMemorySharePoint {
    InMemorySharePoint::new("sut01")
        .with_folder(DESTINATION_LIBRARY)
        .with_meeting_workspace_folder(MEETING_WORKSPACE_LIBRARY)
        .with_file(SOURCE_FILE, SOURCE_CONTENTS)
        .unwrap()
        .with_file(SOURCE_FILE_ON_DESTINATION, SOURCE_CONTENTS)
        .unwrap()
}

#[test]
fn test_copys_suite_passes() {
    init_logging();
    let server = copys_server();
    let mut suite = CopysSuite::setup(&server, &server, copys_properties()).unwrap();

    let reports = run_all(&mut suite);
    assert_eq!(failures(&reports), Vec::<String>::new());
    assert!(reports.iter().all(CaseReport::passed));

    let site = suite.teardown().unwrap();
    for id in [165, 1048, 73, 75, 207, 102, 96, 104, 176, 200, 208, 281, 92, 97, 103, 111, 261, 311] {
        assert!(site.is_captured(id), "R{id} was not captured");
    }
    assert!(server.file_exists(SOURCE_FILE));
    assert!(server.file_exists(SOURCE_FILE_ON_DESTINATION));
}

#[test]
fn test_copy_into_items_without_source_server_is_inconclusive() {
    init_logging();
    let server = copys_server();
    let mut properties = copys_properties();
    properties.set("SourceSutComputerName", "");
    properties.set("R1048Enabled", "false");
    let mut suite = CopysSuite::setup(&server, &server, properties).unwrap();

    let reports = run_all(&mut suite);
    assert_eq!(failures(&reports), Vec::<String>::new());
    assert!(matches!(
        outcome_of(&reports, "S01_TC06_CopyIntoItems_ErrorCodeForSuccess"),
        CaseOutcome::Inconclusive(_)
    ));
    assert!(matches!(
        outcome_of(&reports, "S01_TC02_GetItem_Fail"),
        CaseOutcome::Inconclusive(_)
    ));
    assert_eq!(
        outcome_of(&reports, "S02_TC01_CopyIntoItemsLocal_ErrorCodeForSuccess"),
        &CaseOutcome::Passed
    );
    suite.teardown().unwrap();
}

#[test]
fn test_copied_file_is_released_after_checked_out_case() {
    init_logging();
    let server = copys_server();
    let mut suite = CopysSuite::setup(&server, &server, copys_properties()).unwrap();

    let case = CopysSuite::cases()
        .into_iter()
        .find(|case| case.name == "S02_TC04_CopyIntoItemsLocal_DestinationCheckedOut")
        .unwrap();
    let report = run_case(&mut suite, case);
    assert!(report.passed(), "{report:?}");

    // teardown deletes the uploaded file, which fails while it is checked out
    suite.teardown().unwrap();
}

#[test]
fn test_copys_setup_rejects_folder_as_source() {
    let server = copys_server();
    let properties = copys_properties().with("SourceFileUrlOnSourceSUT", "http://sut02/sites/source/SharedDocuments");
    assert!(CopysSuite::setup(&server, &server, properties).is_err());
}
