use std::io;

use slog::{Drain, OwnedKVList, Record, KV};
use slog_term::{Decorator, RecordDecorator, Serializer};

pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.3f %:z";

/// LineFormat is a slog drain that writes one record per line:
///
/// ```text
/// [2020/05/03 10:13:55.035 +08:00] [INFO] commit, iid: (1, 3), replica_id: 2 (src/replica/handlers.rs:132)
/// ```
///
/// Fields of the record come first, then the fields of the logger, e.g. `replica_id`. The
/// source location goes last so that lines of one replica read as a column of messages.
pub struct LineFormat<D: Decorator> {
    decorator: D,
}

impl<D: Decorator> LineFormat<D> {
    pub fn new(decorator: D) -> Self {
        LineFormat { decorator }
    }
}

impl<D: Decorator> Drain for LineFormat<D> {
    type Ok = ();
    type Err = io::Error;

    fn log(&self, record: &Record, values: &OwnedKVList) -> io::Result<()> {
        self.decorator.with_record(record, values, |rd| {
            rd.start_timestamp()?;
            write!(rd, "[{}]", chrono::Local::now().format(TIMESTAMP_FORMAT))?;
            space(rd)?;

            rd.start_level()?;
            write!(rd, "[{}]", record.level().as_short_str())?;
            space(rd)?;

            rd.start_msg()?;
            write!(rd, "{}", record.msg())?;

            // `reverse` restores the written order; one serializer each keeps record fields first
            let mut ser = Serializer::new(rd, true, true);
            record.kv().serialize(record, &mut ser)?;
            ser.finish()?;

            let mut ser = Serializer::new(rd, true, true);
            values.serialize(record, &mut ser)?;
            ser.finish()?;

            space(rd)?;
            rd.start_key()?;
            write!(rd, "({}:{})", record.file(), record.line())?;

            rd.start_whitespace()?;
            writeln!(rd)?;
            rd.flush()
        })
    }
}

fn space(rd: &mut dyn RecordDecorator) -> io::Result<()> {
    rd.start_whitespace()?;
    write!(rd, " ")
}
