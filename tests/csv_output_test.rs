use div2csv::{extract, ColumnSpec, Specification};

fn csv_for(html: &str, spec: &Specification) -> String {
    extract(html, spec)
        .expect("extraction failed")
        .to_csv_string()
        .expect("csv serialization failed")
}

#[test]
fn header_lists_visible_columns_in_declared_order() {
    let spec = Specification::new(vec![
        ColumnSpec::new("b").locator("b"),
        ColumnSpec::root("//p"),
        ColumnSpec::new("i").locator("i"),
    ]);

    let csv = csv_for("<p><i>x</i><b>y</b></p>", &spec);
    assert_eq!(csv, "b,i\r\ny,x\r\n");
}

#[test]
fn fields_with_commas_and_quotes_are_quoted() {
    let spec = Specification::new(vec![
        ColumnSpec::root("//li"),
        ColumnSpec::new("text").locator("."),
    ]);

    let csv = csv_for(
        r#"<ul><li>Smith, John</li><li>The "best" one</li><li>plain</li></ul>"#,
        &spec,
    );
    assert_eq!(
        csv,
        "text\r\n\"Smith, John\"\r\n\"The \"\"best\"\" one\"\r\nplain\r\n"
    );
}

#[test]
fn hyperlink_cells_are_escaped_as_csv() {
    let spec = Specification::new(vec![
        ColumnSpec::root("//p"),
        ColumnSpec::new("link").locator("a"),
    ]);

    let csv = csv_for(r#"<p><a href="/x">Go</a></p>"#, &spec);
    assert_eq!(csv, "link\r\n\"<a href=\"\"/x\"\">Go</a>\"\r\n");
}

#[test]
fn missing_values_appear_verbatim() {
    let spec = Specification::new(vec![
        ColumnSpec::root("//li"),
        ColumnSpec::new("a").locator("b"),
        ColumnSpec::new("z").locator("em"),
    ]);

    let csv = csv_for("<ul><li><b>1</b></li><li><em>2</em></li></ul>", &spec);
    assert_eq!(csv, "a,z\r\n1,<empty>\r\n<empty>,2\r\n");
}

#[test]
fn header_names_are_trimmed() {
    let spec = Specification::new(vec![
        ColumnSpec::root("//li"),
        ColumnSpec::new("  padded ").locator("."),
    ]);

    let csv = csv_for("<ul><li>v</li></ul>", &spec);
    assert!(csv.starts_with("padded\r\n"), "{csv}");
}

#[test]
fn write_csv_targets_any_writer() {
    let spec = Specification::new(vec![
        ColumnSpec::root("//li"),
        ColumnSpec::new("n").locator("."),
    ]);
    let table = extract("<ul><li>1</li><li>2</li></ul>", &spec).expect("extraction failed");

    let mut buf = Vec::new();
    table.write_csv(&mut buf).expect("csv serialization failed");
    assert_eq!(String::from_utf8(buf).expect("utf-8"), "n\r\n1\r\n2\r\n");
}
