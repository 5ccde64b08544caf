use crate::error::DownloaderError;
use crate::identity::CatalogIdentity;
use crate::types::CatalogRecord;
use calamine::{open_workbook_from_rs, Reader, Xlsx};
use csv::{ReaderBuilder, WriterBuilder};
use log::{debug, info};
use serde::Serialize;
use std::io::Cursor;

/// Header spellings seen across catalog revisions, in priority order.
const TITLE_COLUMNS: &[&str] = &["book title", "title", "buchtitel", "titel"];
const URL_COLUMNS: &[&str] = &["doi url", "openurl", "url", "link"];
const PACKAGE_COLUMNS: &[&str] = &["english package name", "ebook package", "package", "paket"];

/// Zip local file header; published catalogs are xlsx workbooks.
const XLSX_MAGIC: &[u8] = b"PK\x03\x04";

struct ColumnMap {
    title: usize,
    url: usize,
    package: Option<usize>,
}

fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn find_column(headers: &[String], synonyms: &[&str]) -> Option<usize> {
    synonyms
        .iter()
        .find_map(|name| headers.iter().position(|h| h == name))
}

fn map_columns(headers: &[String]) -> Result<ColumnMap, DownloaderError> {
    let title = find_column(headers, TITLE_COLUMNS)
        .ok_or_else(|| DownloaderError::Schema("title".to_string()))?;
    let url = find_column(headers, URL_COLUMNS)
        .ok_or_else(|| DownloaderError::Schema("url".to_string()))?;
    let package = find_column(headers, PACKAGE_COLUMNS);
    debug!("Column mapping: title={} url={} package={:?}", title, url, package);
    Ok(ColumnMap { title, url, package })
}

fn detect_delimiter(contents: &[u8]) -> u8 {
    let first_line = contents.split(|b| *b == b'\n').next().unwrap_or(&[]);
    if first_line.contains(&b'\t') && !first_line.contains(&b',') {
        b'\t'
    } else {
        b','
    }
}

fn field(row: &[String], index: usize) -> String {
    row.get(index).map(|v| v.trim().to_string()).unwrap_or_default()
}

/// Turns raw catalog content into records, one per row.
///
/// Excel workbooks (as published) are read from their first sheet; anything
/// else is read as comma or tab delimited text, which is also the cache
/// format. Rows without a title or URL are skipped.
pub fn parse_catalog(
    raw: &[u8],
    identity: CatalogIdentity,
) -> Result<Vec<CatalogRecord>, DownloaderError> {
    let (headers, rows) = if raw.starts_with(XLSX_MAGIC) {
        read_workbook(raw)?
    } else {
        read_delimited(raw)?
    };
    let headers: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    let columns = map_columns(&headers)?;

    let mut entries = Vec::new();
    let mut skipped = 0usize;

    for row in rows {
        let row = match row {
            Some(row) => row,
            None => {
                skipped += 1;
                continue;
            }
        };

        let title = field(&row, columns.title);
        let url = field(&row, columns.url);
        if title.is_empty() || url.is_empty() {
            skipped += 1;
            continue;
        }

        let entry = CatalogRecord {
            title,
            package: columns.package.map(|i| field(&row, i)).unwrap_or_default(),
            url,
            identity,
        };
        debug!("Parsed entry: {:?}", entry);
        entries.push(entry);
    }

    info!(
        "Parsed {} records for catalog {} ({} rows skipped)",
        entries.len(),
        identity,
        skipped
    );
    Ok(entries)
}

/// Header row plus data rows; `None` marks a row that could not be read.
type Table = (Vec<String>, Vec<Option<Vec<String>>>);

fn read_delimited(raw: &[u8]) -> Result<Table, DownloaderError> {
    let contents = raw.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(raw);

    let mut reader = ReaderBuilder::new()
        .delimiter(detect_delimiter(contents))
        .flexible(true)
        .from_reader(contents);

    let headers = reader
        .byte_headers()
        .map_err(|e| DownloaderError::Schema(format!("header row ({})", e)))?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();

    let rows = reader
        .byte_records()
        .map(|result| match result {
            Ok(record) => Some(
                record
                    .iter()
                    .map(|cell| String::from_utf8_lossy(cell).into_owned())
                    .collect(),
            ),
            Err(e) => {
                debug!("Skipping unreadable row: {}", e);
                None
            }
        })
        .collect();

    Ok((headers, rows))
}

fn read_workbook(raw: &[u8]) -> Result<Table, DownloaderError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(raw))
        .map_err(|e| DownloaderError::Schema(format!("workbook ({})", e)))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DownloaderError::Schema("worksheet".to_string()))?
        .map_err(|e| DownloaderError::Schema(format!("worksheet ({})", e)))?;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<String>>());
    let headers = rows.next().unwrap_or_default();
    Ok((headers, rows.map(Some).collect()))
}

#[derive(Serialize)]
struct CacheRow<'a> {
    title: &'a str,
    package: &'a str,
    url: &'a str,
}

/// Serializes records in the cache format, which `parse_catalog` reads back.
pub fn serialize_catalog(records: &[CatalogRecord]) -> Result<Vec<u8>, DownloaderError> {
    let mut wtr = WriterBuilder::new().from_writer(Vec::new());
    for record in records {
        wtr.serialize(CacheRow {
            title: &record.title,
            package: &record.package,
            url: &record.url,
        })?;
    }
    if records.is_empty() {
        wtr.write_record(["title", "package", "url"])?;
    }
    wtr.into_inner()
        .map_err(|e| DownloaderError::IoError(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> CatalogIdentity {
        CatalogIdentity::FALLBACK
    }

    #[test]
    fn test_parse_known_headers() {
        let raw = "Book Title,Author,English Package Name,DOI URL\n\
                   A Beginners Guide to Python,Someone,Computer Science,http://doi.org/10.1007/1\n\
                   Biology Basics,Other,Life Sciences,http://doi.org/10.1007/2\n";
        let records = parse_catalog(raw.as_bytes(), identity()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "A Beginners Guide to Python");
        assert_eq!(records[0].package, "Computer Science");
        assert_eq!(records[1].url, "http://doi.org/10.1007/2");
        assert_eq!(records[1].identity, identity());
    }

    #[test]
    fn test_header_matching_is_case_and_space_insensitive() {
        let raw = "  BOOK   title ,ebook PACKAGE,openurl\nX,P,http://x/1\n";
        let records = parse_catalog(raw.as_bytes(), identity()).unwrap();
        assert_eq!(records[0].title, "X");
        assert_eq!(records[0].package, "P");
    }

    #[test]
    fn test_priority_prefers_doi_url_over_openurl() {
        let raw = "Title,OpenURL,DOI URL\nX,http://open/1,http://doi.org/a/b\n";
        let records = parse_catalog(raw.as_bytes(), identity()).unwrap();
        assert_eq!(records[0].url, "http://doi.org/a/b");
    }

    #[test]
    fn test_rows_without_title_or_url_are_skipped() {
        let raw = "Title,URL\n,http://x/1\nNo Url,\nGood,http://x/2\nshort\n";
        let records = parse_catalog(raw.as_bytes(), identity()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Good");
    }

    #[test]
    fn test_missing_package_column_yields_empty_package() {
        let raw = "Title,URL\nX,http://x/1\n";
        let records = parse_catalog(raw.as_bytes(), identity()).unwrap();
        assert_eq!(records[0].package, "");
    }

    #[test]
    fn test_missing_columns_is_schema_error() {
        let err = parse_catalog(b"Name,Link Text\nX,Y\n", identity()).unwrap_err();
        assert!(matches!(err, DownloaderError::Schema(ref c) if c == "title"));
        let err = parse_catalog(b"Title,Author\nX,Y\n", identity()).unwrap_err();
        assert!(matches!(err, DownloaderError::Schema(ref c) if c == "url"));
        assert!(parse_catalog(b"", identity()).is_err());
    }

    #[test]
    fn test_tab_delimited_with_bom() {
        let raw = b"\xEF\xBB\xBFBook Title\tDOI URL\nX\thttp://doi.org/a/b\n";
        let records = parse_catalog(raw, identity()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "X");
    }

    #[test]
    fn test_serialized_catalog_parses_back() {
        let raw = "Book Title,English Package Name,DOI URL\n\
                   \"Algebra, Linear\",Mathematics,http://doi.org/a/1\n\
                   Biology Basics,Life Sciences,http://doi.org/a/2\n";
        let records = parse_catalog(raw.as_bytes(), identity()).unwrap();
        let cached = serialize_catalog(&records).unwrap();
        assert_eq!(parse_catalog(&cached, identity()).unwrap(), records);
    }

    #[test]
    fn test_parse_published_workbook() {
        let raw = include_bytes!("../tests/fixtures/catalog.xlsx");
        let records = parse_catalog(raw, identity()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "A Beginners Guide to Python");
        assert_eq!(records[0].package, "Computer Science");
        assert_eq!(records[0].url, "http://doi.org/10.1007/978-1-0000-0001-1");
        assert_eq!(records[1].title, "Biology Basics");
    }

    #[test]
    fn test_workbook_round_trips_through_cache_format() {
        let records = parse_catalog(include_bytes!("../tests/fixtures/catalog.xlsx"), identity()).unwrap();
        let cached = serialize_catalog(&records).unwrap();
        assert_eq!(parse_catalog(&cached, identity()).unwrap(), records);
    }

    #[test]
    fn test_corrupt_workbook_is_schema_error() {
        let err = parse_catalog(b"PK\x03\x04not really a zip", identity()).unwrap_err();
        assert!(matches!(err, DownloaderError::Schema(_)));
    }

    #[test]
    fn test_serialize_empty_catalog_keeps_header() {
        let cached = serialize_catalog(&[]).unwrap();
        assert!(parse_catalog(&cached, identity()).unwrap().is_empty());
    }
}
