use super::*;
use tempfile::TempDir;

fn sample() -> ConfigDocument {
    ConfigDocument::from_lines([
        "Output Times",
        "1.000e+05",
        "rain",
        "x",
        "time raster table",
        "0",
        "potential evapotranspiration",
        "time raster table",
        "0",
    ])
}

#[test]
fn from_lines_trims_and_folds_case() {
    let doc = ConfigDocument::from_lines(["  Output Times  ", "\tInclude Foo.INC"]);
    assert_eq!(doc.lines(), ["output times", "include foo.inc"]);
}

#[test]
fn get_reads_line_after_keyword_case_insensitively() {
    let doc = sample();
    let value = doc
        .get("OUTPUT TIMES", Decoder::Float, &Lookup::default())
        .unwrap();
    assert_eq!(value, Value::Float(1.0e5));
    assert_eq!(
        doc.get_raw("output times", &Lookup::default()).unwrap(),
        "1.000e+05"
    );
}

#[test]
fn anchor_selects_later_occurrence() {
    let doc = sample();
    let first = doc.locate("time raster table", &Lookup::default()).unwrap();
    let second = doc
        .locate(
            "time raster table",
            &Lookup::after("potential evapotranspiration"),
        )
        .unwrap();
    assert_eq!(first, 5);
    assert_eq!(second, 8);
}

#[test]
fn set_after_anchor_overwrites_value_line() {
    let mut doc = ConfigDocument::from_lines(["rain", "x", "time raster table", "0"]);
    doc.set(
        "time raster table",
        "include precip.inc",
        Encoding::Plain,
        &Lookup::after("rain"),
    )
    .unwrap();
    assert_eq!(
        doc.lines(),
        ["rain", "x", "time raster table", "include precip.inc"]
    );
}

#[test]
fn set_then_get_round_trips_scientific_floats() {
    let mut doc = sample();
    doc.set(
        "output times",
        86400.0,
        Encoding::Scientific(3),
        &Lookup::default(),
    )
    .unwrap();
    assert_eq!(doc.lines()[1], "8.640e+04");
    let value = doc
        .get("output times", Decoder::Float, &Lookup::default())
        .unwrap();
    assert_eq!(value, Value::Float(86400.0));
}

#[test]
fn missing_keyword_is_reported() {
    let mut doc = sample();
    let err = doc
        .set("no such keyword", 1_i64, Encoding::Plain, &Lookup::default())
        .unwrap_err();
    assert!(matches!(err, Error::KeywordNotFound { ref keyword, after: None } if keyword == "no such keyword"));
}

#[test]
fn missing_anchor_is_reported_as_keyword_failure() {
    let doc = sample();
    let err = doc
        .get_raw("time raster table", &Lookup::after("snow"))
        .unwrap_err();
    assert!(matches!(err, Error::KeywordNotFound { after: Some(ref anchor), .. } if anchor == "snow"));
}

#[test]
fn search_respects_start_index() {
    let doc = sample();
    let err = doc
        .get_raw("output times", &Lookup::default().starting_at(2))
        .unwrap_err();
    assert!(matches!(err, Error::KeywordNotFound { .. }));
}

#[test]
fn keyword_on_last_line_has_no_value() {
    let doc = ConfigDocument::from_lines(["a", "1", "dangling"]);
    assert!(doc.get_raw("dangling", &Lookup::default()).is_err());
}

#[test]
fn replace_token_overwrites_matching_line() {
    let mut doc = sample();
    doc.replace_token("X", "y", Encoding::Plain, &Lookup::after("rain"))
        .unwrap();
    assert_eq!(doc.lines()[3], "y");

    let err = doc
        .replace_token("x", "z", Encoding::Plain, &Lookup::default())
        .unwrap_err();
    assert!(matches!(err, Error::TokenNotFound { .. }));
}

#[test]
fn set_many_applies_in_order() {
    let mut doc = ConfigDocument::from_lines(["a", "1", "b", "2"]);
    doc.set_many([("a", Value::Integer(10)), ("b", Value::from("two"))])
        .unwrap();
    assert_eq!(doc.lines(), ["a", "10", "b", "two"]);
}

#[test]
fn custom_decoder_is_applied() {
    let doc = ConfigDocument::from_lines(["flags", "t f t"]);
    let flags: Vec<bool> = doc
        .get_with("flags", &Lookup::default(), |raw| {
            Ok(raw.split_whitespace().map(|flag| flag == "t").collect())
        })
        .unwrap();
    assert_eq!(flags, [true, false, true]);
}

#[test]
fn integer_decoder_rejects_garbage() {
    let doc = ConfigDocument::from_lines(["count", "many"]);
    let err = doc
        .get("count", Decoder::Integer, &Lookup::default())
        .unwrap_err();
    assert!(matches!(err, Error::Decode { kind: "integer", .. }));
}

#[test]
fn scientific_format_pads_exponent() {
    assert_eq!(format_scientific(86400.0, 3), "8.640e+04");
    assert_eq!(format_scientific(157_680_000.0, 3), "1.577e+08");
    assert_eq!(format_scientific(0.00125, 2), "1.25e-03");
    assert_eq!(format_scientific(-1.5e120, 1), "-1.5e+120");
}

#[test]
fn load_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let mut doc = ConfigDocument::new();
    let err = doc.load(&dir.path().join("absent.grok")).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    let err = doc.load(dir.path()).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn save_then_load_round_trips_and_keeps_one_backup() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.grok");
    std::fs::write(&path, "Output Times\n  1.0E+05 \nEND\n").unwrap();

    let mut doc = ConfigDocument::new();
    doc.load(&path).unwrap();
    assert_eq!(doc.source_path(), Some(path.as_path()));
    assert_eq!(doc.lines(), ["output times", "1.0e+05", "end"]);

    doc.save(&path).unwrap();
    assert_eq!(doc.target_path(), Some(path.as_path()));
    let backup = backup_path(&path);
    assert_eq!(
        std::fs::read_to_string(&backup).unwrap(),
        "Output Times\n  1.0E+05 \nEND\n"
    );
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "output times\n1.0e+05\nend\n"
    );

    // second save replaces the backup with the previous output
    doc.save(&path).unwrap();
    assert_eq!(
        std::fs::read_to_string(&backup).unwrap(),
        "output times\n1.0e+05\nend\n"
    );

    let mut reloaded = ConfigDocument::new();
    reloaded.load(&path).unwrap();
    assert_eq!(reloaded.lines(), doc.lines());
}
