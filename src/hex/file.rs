use super::{
	Record,
	RecordType,
};

/// Parses the data records of a program file.
///
/// Reading stops at the end-of-file record; a line that isn't a 3-byte data
/// record is an error.
pub fn parse_program(text: &str) -> crate::AResult<Vec<Record>> {
	let mut records = Vec::new();

	for (index, line) in text.lines().enumerate() {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}

		// the end-of-file record is shorter than data records
		if line.len() >= 9 && line.is_ascii() && &line[7..9] == "01" {
			debug!("line {}: end of file record", index + 1);
			break;
		}

		let record = with_context!(("line {}", index + 1), Record::parse(line))?;
		ensure!(record.kind() == RecordType::Data,
			"line {}: unsupported record type {}", index + 1, record.record_type()
		);
		if !record.is_consistent() {
			warn!("line {}: record checksum {} doesn't match its contents (expected {})",
				index + 1, record.checksum(), record.computed_checksum()
			);
		}
		records.push(record);
	}

	Ok(records)
}

#[cfg(test)]
mod test {
	use super::parse_program;

	#[test]
	fn stops_at_end_of_file_record() {
		let text = ":031000003400aa0f\n\n:03100100000000ec\r\n:00000001FF\n:03100200000000eb\n";
		let records = parse_program(text).unwrap();
		assert_eq!(records.len(), 2);
		assert_eq!(records[0].address().to_string(), "0x1000");
		assert_eq!(records[1].data().to_string(), "0x000000");
	}

	#[test]
	fn without_end_of_file_record() {
		let records = parse_program(":031000003400aa0f\n:03100100000000ec").unwrap();
		assert_eq!(records.len(), 2);
	}

	#[test]
	fn rejects_other_records() {
		assert!(parse_program(":031000003400aa0f\n:02000004ffff\n").is_err());
		assert!(parse_program(":031000023400aa0d\n").is_err());
	}
}
