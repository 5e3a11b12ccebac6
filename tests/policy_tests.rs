use rstest::rstest;

use stegoguard::policy::{
    CORRUPTED_REASON, HIDDEN_CONTENT_REASON, admit, check_declared_mime, quick_validation,
};
use stegoguard::{Admission, AnalysisResult, Detection, FileTag, MimeCheck, Risk, SignatureKind};

fn unsafe_result(tag: FileTag, hidden: Vec<Detection>) -> AnalysisResult {
    let mut result = AnalysisResult::rejected(tag, 1024, "flagged");
    result.hidden_files = hidden;
    result
}

fn safe_result(tag: FileTag, mime: Option<&str>) -> AnalysisResult {
    let mut result = AnalysisResult::rejected(tag, 1024, "File is safe");
    result.safe = true;
    result.detected_mime = mime.map(str::to_string);
    result
}

#[rstest]
#[case("setup.exe", "application/octet-stream", false)]
#[case("RUN.BAT", "text/plain", false)]
#[case("script.js", "text/javascript", false)]
#[case("image.png", "application/x-msdownload", false)]
#[case("install", "text/x-sh", false)]
#[case("photo.jpg", "image/jpeg", true)]
#[case("notes", "text/plain", true)]
fn test_quick_validation(#[case] filename: &str, #[case] mime: &str, #[case] safe: bool) {
    assert_eq!(quick_validation(mime, filename).safe, safe);
}

#[test]
fn test_quick_validation_reasons() {
    assert_eq!(
        quick_validation("image/png", "evil.scr").reason.as_deref(),
        Some("File extension not allowed")
    );
    assert_eq!(
        quick_validation("application/x-sh", "evil.txt").reason.as_deref(),
        Some("File type not allowed")
    );
}

#[test]
fn test_safe_files_are_accepted() {
    assert_eq!(admit(&safe_result(FileTag::Png, None)), Admission::Accept);
}

#[test]
fn test_relaxed_type_with_exe_is_accepted_with_warning() {
    let result = unsafe_result(
        FileTag::Mp4,
        vec![Detection::new(SignatureKind::Exe, 900, Risk::Critical)],
    );
    assert_eq!(admit(&result), Admission::AcceptWithWarning { critical: 1 });
}

#[test]
fn test_relaxed_type_with_hidden_archive_is_accepted_with_warning() {
    let result = unsafe_result(
        FileTag::Pdf,
        vec![Detection::new(SignatureKind::Zip, 300, Risk::High)],
    );
    assert_eq!(admit(&result), Admission::AcceptWithWarning { critical: 0 });
}

#[test]
fn test_relaxed_type_with_elf_is_rejected() {
    let result = unsafe_result(
        FileTag::Zip,
        vec![
            Detection::new(SignatureKind::Exe, 10, Risk::Critical),
            Detection::new(SignatureKind::Elf, 20, Risk::Critical),
        ],
    );
    assert_eq!(
        admit(&result),
        Admission::Reject {
            reason: HIDDEN_CONTENT_REASON.to_string()
        }
    );
}

#[test]
fn test_corrupted_relaxed_type_is_rejected() {
    let mut result = unsafe_result(FileTag::Mp4, Vec::new());
    result.corrupted = Some(true);
    assert_eq!(
        admit(&result),
        Admission::Reject {
            reason: CORRUPTED_REASON.to_string()
        }
    );
}

#[test]
fn test_images_have_no_relaxation() {
    let result = unsafe_result(
        FileTag::Png,
        vec![Detection::new(SignatureKind::Zip, 300, Risk::High)],
    );
    assert!(!admit(&result).is_admitted());
    assert!(!admit(&unsafe_result(FileTag::Unknown, Vec::new())).is_admitted());
}

#[test]
fn test_declared_mime_matches() {
    let jpeg = safe_result(FileTag::Jpeg, Some("image/jpeg"));
    assert_eq!(check_declared_mime(&jpeg, "image/jpg", "a.jpg"), MimeCheck::Match);
    assert_eq!(
        check_declared_mime(&jpeg, "application/octet-stream", "a.bin"),
        MimeCheck::Match
    );
}

#[test]
fn test_declared_mime_mismatch() {
    let png = safe_result(FileTag::Png, None);
    let check = check_declared_mime(&png, "application/pdf", "doc.pdf");
    assert!(check.is_mismatch());
    assert_eq!(
        check.reason().as_deref(),
        Some("The file claims to be application/pdf but its content is PNG")
    );
}

#[test]
fn test_ooxml_declared_for_zip_needs_matching_extension() {
    let zip = safe_result(FileTag::Zip, Some("application/zip"));
    let docx = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

    let mut plain_zip = zip.clone();
    plain_zip.detected_mime = None;
    assert_eq!(
        check_declared_mime(&plain_zip, docx, "Report.DOCX"),
        MimeCheck::OoxmlAsZip
    );
    assert!(check_declared_mime(&plain_zip, docx, "report.xlsx").is_mismatch());
    assert_eq!(check_declared_mime(&zip, docx, "report.xlsx"), MimeCheck::Match);
}

#[test]
fn test_types_without_allow_list_are_unchecked() {
    let exe = safe_result(FileTag::Exe, None);
    assert_eq!(check_declared_mime(&exe, "image/png", "x.png"), MimeCheck::Unchecked);
}

#[test]
fn test_admission_json_shape() {
    let json = serde_json::to_value(Admission::AcceptWithWarning { critical: 2 }).unwrap();
    assert_eq!(json["decision"], "acceptWithWarning");
    assert_eq!(json["critical"], 2);
}
