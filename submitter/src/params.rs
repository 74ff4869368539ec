use csv::StringRecord;
use std::{fs::File, io, path::Path};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParamsError {
    #[error("Failed to open parameter file")]
    OpenFile(#[from] io::Error),
    #[error("Failed to read parameter record")]
    ReadRecord(#[from] csv::Error),
    #[error("Record on line {line} has {found} field(s), expected at least 3")]
    TooFewFields { line: u64, found: usize },
}

/// one parsed parameter record, feeds exactly one submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobRecord {
    pub week: String,
    pub source: String,
    pub data: String,
}

impl JobRecord {
    // fields are positional, anything past the third is ignored
    fn from_record(record: &StringRecord) -> Result<Self, ParamsError> {
        match (record.get(0), record.get(1), record.get(2)) {
            (Some(week), Some(source), Some(data)) => Ok(Self {
                week: week.to_owned(),
                source: source.to_owned(),
                data: data.to_owned(),
            }),
            _ => Err(ParamsError::TooFewFields {
                line: record
                    .position()
                    .map(|position| position.line())
                    .unwrap_or(0),
                found: record.len(),
            }),
        }
    }
}

/// Lazy reader over a parameter file, yielding records in file order.
///
/// Laziness is load-bearing: records ahead of a malformed one must already
/// have been handed to the executor by the time its error surfaces.
pub struct ParamReader {
    records: csv::StringRecordsIntoIter<File>,
}

impl ParamReader {
    pub fn open(path: &Path) -> Result<Self, ParamsError> {
        let file = File::open(path)?;
        // no header row; arity is checked per record in from_record so a
        // short record fails as a record error instead of tripping the
        // reader's length-consistency check
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        Ok(Self {
            records: reader.into_records(),
        })
    }
}

impl Iterator for ParamReader {
    type Item = Result<JobRecord, ParamsError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next().map(|record| match record {
            Ok(record) => JobRecord::from_record(&record),
            Err(error) => Err(error.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_params(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();

        file
    }

    #[test]
    fn records_come_back_in_file_order() {
        let file = write_params("W1,srcA,dataA\nW2,srcB,dataB\n");
        let records = ParamReader::open(file.path())
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(
            records,
            vec![
                JobRecord {
                    week: "W1".to_owned(),
                    source: "srcA".to_owned(),
                    data: "dataA".to_owned(),
                },
                JobRecord {
                    week: "W2".to_owned(),
                    source: "srcB".to_owned(),
                    data: "dataB".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn extra_fields_are_ignored() {
        let file = write_params("W1,srcA,dataA,leftover\n");
        let record = ParamReader::open(file.path())
            .unwrap()
            .next()
            .unwrap()
            .unwrap();

        assert_eq!(record.week, "W1");
        assert_eq!(record.data, "dataA");
    }

    #[test]
    fn short_record_fails_with_its_line_number() {
        let file = write_params("W1,srcA,dataA\nW2,srcB\n");
        let mut reader = ParamReader::open(file.path()).unwrap();

        assert!(reader.next().unwrap().is_ok());
        match reader.next().unwrap() {
            Err(ParamsError::TooFewFields { line, found }) => {
                assert_eq!(line, 2);
                assert_eq!(found, 2);
            }
            other => panic!("expected a record error, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_an_open_error() {
        assert!(matches!(
            ParamReader::open(Path::new("/definitely/not/here.csv")),
            Err(ParamsError::OpenFile(_))
        ));
    }
}
