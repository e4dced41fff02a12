use eyre::Result;

/// Pull-based reading of structured records, in the spirit of `std::io::Read`: callers own the
/// record buffer and readers overwrite it in place.
pub trait ReadRecord {
    type Record;

    /// Read the next record into `into`. Returns `false` once the input is exhausted, in which
    /// case the content of `into` is unspecified.
    fn read_record(&mut self, into: &mut Self::Record) -> Result<bool>;

    /// Read all remaining records, appending them to `into`. Returns the number of records read.
    fn read_to_end(&mut self, into: &mut Vec<Self::Record>) -> Result<usize>
    where
        Self::Record: Default,
    {
        let mut total = 0;
        loop {
            let mut record = Self::Record::default();
            if !self.read_record(&mut record)? {
                break;
            }
            into.push(record);
            total += 1;
        }
        Ok(total)
    }
}

/// Push-based writing of structured records, in the spirit of `std::io::Write`.
pub trait WriteRecord {
    type Record;

    fn write_record(&mut self, record: &Self::Record) -> Result<()>;

    fn write_records(&mut self, records: &[Self::Record]) -> Result<()> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()>;
}
