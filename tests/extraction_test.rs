use div2csv::{
    extract, extract_bytes, extract_file, extract_with_options, ColumnSpec, Error, ExtractOptions,
    Extractor, RecordPolicy, Specification,
};

const CATALOG: &str = r#"
<html><body>
  <ul id="catalog">
    <li><h2>Widget</h2><span class="tag">tools</span></li>
    <li><h2>Gadget</h2><em>misc</em></li>
    <li><h2>Doohickey</h2></li>
  </ul>
</body></html>
"#;

fn catalog_spec() -> Specification {
    Specification::new(vec![
        ColumnSpec::root("//ul[@id='catalog']/li"),
        ColumnSpec::new("title").required().locator("h2"),
        ColumnSpec::new("tag")
            .locator("span[@class='tag']")
            .locator("em"),
    ])
}

#[test]
fn one_row_per_fragment_in_document_order() {
    let table = extract(CATALOG, &catalog_spec()).expect("extraction failed");

    assert_eq!(table.columns(), ["title", "tag"]);
    assert_eq!(table.len(), 3);
    let titles: Vec<_> = table.rows().filter_map(|r| r.get("title")).collect();
    assert_eq!(titles, ["Widget", "Gadget", "Doohickey"]);
}

#[test]
fn fallback_locators_and_missing_value_sentinel() {
    let table = extract(CATALOG, &catalog_spec()).expect("extraction failed");
    let tags: Vec<_> = table.rows().filter_map(|r| r.get("tag")).collect();
    assert_eq!(tags, ["tools", "misc", "<empty>"]);
}

#[test]
fn earlier_locator_wins_even_when_later_one_matches_first_in_document() {
    let html = r#"<div class="rec"><em>second choice</em><b>first choice</b></div>"#;
    let spec = Specification::new(vec![
        ColumnSpec::root("//div[@class='rec']"),
        ColumnSpec::new("value").locator("b").locator("em"),
    ]);

    let table = extract(html, &spec).expect("extraction failed");
    assert_eq!(table.row(0).and_then(|r| r.get("value")), Some("first choice"));
}

#[test]
fn missing_required_column_aborts_the_whole_run() {
    let html = r#"
        <ul>
          <li><h2>One</h2><span>a</span></li>
          <li><span>only a tag</span></li>
          <li><h2>Three</h2><em>c</em></li>
        </ul>"#;
    let spec = Specification::new(vec![
        ColumnSpec::root("//li"),
        ColumnSpec::new("title").required().locator("h2"),
        ColumnSpec::new("tag").locator("span").locator("em"),
    ]);

    match extract(html, &spec) {
        Err(Error::MissingRequiredColumn {
            column,
            record,
            context,
        }) => {
            assert_eq!(column, "title");
            assert_eq!(record, 1);
            assert_eq!(context, "only a tag");
        }
        other => panic!("expected Err(MissingRequiredColumn), got {other:?}"),
    }
}

#[test]
fn skip_policy_drops_invalid_records() {
    let html = "<ul><li><b>1</b></li><li>none</li><li><b>3</b></li></ul>";
    let spec = Specification::new(vec![
        ColumnSpec::root("//li"),
        ColumnSpec::new("n").required().locator("b"),
    ]);
    let options = ExtractOptions {
        on_invalid_record: RecordPolicy::Skip,
        ..ExtractOptions::default()
    };

    let table = extract_with_options(html, &spec, &options).expect("extraction failed");
    let values: Vec<_> = table.rows().filter_map(|r| r.get("n")).collect();
    assert_eq!(values, ["1", "3"]);
}

#[test]
fn skip_policy_with_every_record_invalid_reports_no_records() {
    let html = "<ul><li>x</li><li>y</li></ul>";
    let spec = Specification::new(vec![
        ColumnSpec::root("//li"),
        ColumnSpec::new("n").required().locator("b"),
    ]);
    let options = ExtractOptions {
        on_invalid_record: RecordPolicy::Skip,
        ..ExtractOptions::default()
    };

    let result = extract_with_options(html, &spec, &options);
    assert!(matches!(result, Err(Error::NoRecordsFound { .. })));
}

#[test]
fn root_matching_nothing_is_no_records_found() {
    let spec = Specification::new(vec![
        ColumnSpec::root("//table/tr"),
        ColumnSpec::new("x").locator("td"),
    ]);

    match extract("<p>nothing tabular</p>", &spec) {
        Err(Error::NoRecordsFound { locator }) => assert_eq!(locator, "//table/tr"),
        other => panic!("expected Err(NoRecordsFound), got {other:?}"),
    }
}

#[test]
fn custom_missing_value() {
    let spec = Specification::new(vec![
        ColumnSpec::root("//li"),
        ColumnSpec::new("x").locator("b"),
    ]);
    let options = ExtractOptions {
        missing_value: "N/A".to_string(),
        ..ExtractOptions::default()
    };

    let table = extract_with_options("<ul><li>plain</li></ul>", &spec, &options)
        .expect("extraction failed");
    assert_eq!(table.row(0).and_then(|r| r.get("x")), Some("N/A"));
}

#[test]
fn hyperlinks_keep_their_tag_and_attributes() {
    let html = r#"<div class="item"><a href="/x" class="go">Foo<br/>Bar</a></div>"#;
    let spec = Specification::new(vec![
        ColumnSpec::root("//div[@class='item']"),
        ColumnSpec::new("link").locator("a"),
    ]);

    let table = extract(html, &spec).expect("extraction failed");
    let cell = table.row(0).and_then(|r| r.get("link")).expect("link cell");
    assert!(cell.starts_with("<a "), "{cell}");
    assert!(cell.contains(r#"href="/x""#), "{cell}");
    assert!(cell.contains(r#"class="go""#), "{cell}");
    assert!(cell.contains("FooBar"), "{cell}");
    assert!(cell.ends_with("</a>"), "{cell}");
    assert!(!cell.contains("<br"), "{cell}");
}

#[test]
fn hyperlink_text_is_sanitized_before_wrapping() {
    let html = r#"<p class="r"><a href="https://example.com/p">Read more &raquo;</a></p>"#;
    let spec = Specification::new(vec![
        ColumnSpec::root("//p[@class='r']"),
        ColumnSpec::new("link").locator("a").strip("read"),
    ]);

    let table = extract(html, &spec).expect("extraction failed");
    let cell = table.row(0).and_then(|r| r.get("link")).expect("link cell");
    assert!(cell.contains(r#"href="https://example.com/p""#), "{cell}");
    assert!(cell.contains(">more »</a>"), "{cell}");
}

#[test]
fn attribute_locators_yield_attribute_values() {
    let html = r#"
        <div class="card" data-id=" 17 "><a href="/item/17">Seventeen</a></div>
        <div class="card" data-id="18"><a href="/item/18">Eighteen</a></div>"#;
    let spec = Specification::new(vec![
        ColumnSpec::root("//div[@class='card']"),
        ColumnSpec::new("id").required().locator("@data-id"),
        ColumnSpec::new("url").locator("a/@href"),
    ]);

    let table = extract(html, &spec).expect("extraction failed");
    let ids: Vec<_> = table.rows().filter_map(|r| r.get("id")).collect();
    let urls: Vec<_> = table.rows().filter_map(|r| r.get("url")).collect();
    assert_eq!(ids, ["17", "18"]);
    assert_eq!(urls, ["/item/17", "/item/18"]);
}

#[test]
fn cells_are_sanitized() {
    let html = "<table>\
        <tr><td>Price:&nbsp;<b>12</b> EUR\n</td></tr>\
        <tr><td>  price: 7 eur  </td></tr>\
        </table>";
    let spec = Specification::new(vec![
        ColumnSpec::root("//tr"),
        ColumnSpec::new("price")
            .required()
            .locator("td")
            .strip("price:")
            .strip("eur"),
    ]);

    let table = extract(html, &spec).expect("extraction failed");
    let prices: Vec<_> = table.rows().filter_map(|r| r.get("price")).collect();
    assert_eq!(prices, ["12", "7"]);
}

#[test]
fn escaped_angle_brackets_survive_as_text() {
    let html = r#"<ul>
        <li><span>x &lt; 5 and y &gt; 3</span><a href="/q">&lt;b&gt;bold&lt;/b&gt;</a></li>
    </ul>"#;
    let spec = Specification::new(vec![
        ColumnSpec::root("//li"),
        ColumnSpec::new("cond").locator("span"),
        ColumnSpec::new("link").locator("a"),
    ]);

    let table = extract(html, &spec).expect("extraction failed");
    let row = table.rows().next().expect("one row");
    assert_eq!(row.get("cond"), Some("x < 5 and y > 3"));
    assert_eq!(
        row.get("link"),
        Some(r#"<a href="/q">&lt;b&gt;bold&lt;/b&gt;</a>"#)
    );
}

#[test]
fn predicates_and_absolute_locators_inside_records() {
    let html = r#"
        <h1>Shop</h1>
        <table>
          <tr><td>a</td><td>1</td><td>x</td></tr>
          <tr><td>b</td><td>2</td><td>y</td></tr>
        </table>"#;
    let spec = Specification::new(vec![
        ColumnSpec::root("//tr[td]"),
        ColumnSpec::new("key").locator("td[1]"),
        ColumnSpec::new("last").locator("td[last()]"),
        ColumnSpec::new("shop").locator("/html/body/h1"),
    ]);

    let table = extract(html, &spec).expect("extraction failed");
    let first = table.row(0).expect("row 0");
    assert_eq!(first.cells(), ["a", "x", "Shop"]);
    let second = table.row(1).expect("row 1");
    assert_eq!(second.cells(), ["b", "y", "Shop"]);
}

#[test]
fn invalid_specification_is_rejected_before_extraction() {
    let spec = Specification::new(vec![ColumnSpec::new("title").locator("h2")]);
    assert!(matches!(
        extract(CATALOG, &spec),
        Err(Error::InvalidSpecification(_))
    ));
}

#[test]
fn extractor_is_reusable_across_documents() {
    let extractor = Extractor::new(&catalog_spec(), ExtractOptions::default())
        .expect("valid specification");
    assert_eq!(extractor.column_names(), ["title", "tag"]);

    let first = extractor.extract_html(CATALOG).expect("extraction failed");
    let second = extractor
        .extract_html(r#"<ul id="catalog"><li><h2>Solo</h2></li></ul>"#)
        .expect("extraction failed");
    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 1);
}

#[test]
fn bytes_are_decoded_using_declared_charset() {
    let html = b"<html><head><meta charset=\"ISO-8859-1\"></head>\
        <body><ul><li>Caf\xE9</li><li>M\xFCnchen</li></ul></body></html>";
    let spec = Specification::new(vec![
        ColumnSpec::root("//li"),
        ColumnSpec::new("name").locator("."),
    ]);

    let table = extract_bytes(html, &spec, &ExtractOptions::default()).expect("extraction failed");
    let names: Vec<_> = table.rows().filter_map(|r| r.get("name")).collect();
    assert_eq!(names, ["Café", "München"]);
}

#[test]
fn files_are_read_and_missing_files_fail() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("page.html");
    std::fs::write(&path, CATALOG).expect("write html");

    let table = extract_file(&path, &catalog_spec(), &ExtractOptions::default())
        .expect("extraction failed");
    assert_eq!(table.len(), 3);

    let missing = dir.path().join("missing.html");
    match extract_file(&missing, &catalog_spec(), &ExtractOptions::default()) {
        Err(Error::ExtractionFailed { reason, .. }) => assert!(reason.contains("does not exist")),
        other => panic!("expected Err(ExtractionFailed), got {other:?}"),
    }
}
