use epaxos::conf::ConfError;

quick_error! {
    /// RunError is an error that stops a workload run before it produces a report.
    #[derive(Debug)]
    pub enum RunError {
        Conf(e: ConfError) {
            from(e: ConfError) -> (e)
            display("bad conf: {}", e)
        }

        UnknownProtocol(name: String) {
            display("unknown protocol: {}, expect epaxos or copilot", name)
        }

        BadWorkload(reason: String) {
            display("bad workload: {}", reason)
        }

        /// Not every replica executed every committed command in time.
        NotApplied(want: usize, got: usize) {
            display("want {} commands applied on every replica, but the slowest applied {}", want, got)
        }
    }
}
