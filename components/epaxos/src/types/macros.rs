#[macro_export]
#[allow(unused_macros)]
macro_rules! instid {
    ($replica_id:expr, $idx:expr) => {
        $crate::types::InstanceId::from(($replica_id as i64, $idx as i64))
    };
}

#[macro_export]
#[allow(unused_macros)]
macro_rules! instids {
    [$(($replica_id:expr, $idx:expr)),* $(,)*] => {
        vec![$($crate::types::InstanceId::from(($replica_id as i64, $idx as i64))),*]
    }
}

#[macro_export]
#[allow(unused_macros)]
macro_rules! ballot {
    ($epoch:expr, $num:expr, $replica_id:expr) => {
        $crate::types::Ballot {
            epoch: $epoch as i32,
            num: $num as i32,
            replica_id: $replica_id as i64,
        }
    };
}

/// Create a Deps from `(replica_id, instance_no)` pairs.
///
/// Example:
/// ```
/// #[macro_use] extern crate epaxos;
///
/// let deps = deps![(1, 3), (2, 5)];
/// assert_eq!(Some(5), deps.get(2));
/// assert_eq!(0, deps![].len());
/// ```
#[macro_export]
#[allow(unused_macros)]
macro_rules! deps {
    [$(($rid:expr, $idx:expr)),* $(,)*] => {
        {
            #[allow(unused_mut)]
            let mut d = $crate::types::Deps::new();
            $( d.set($rid as i64, $idx as i64); )*
            d
        }
    }
}

/// Create an instance with:
/// instance_id: (replica_id, idx),
/// cmd: a write of `key`, or the bare word `noop`,
/// seq and deps: [(replica_id, idx)...],
/// status: an InstanceStatus variant name.
///
/// The ballot is the default ballot of the instance's origin.
///
/// Supported pattern:
/// inst!(instance_id, key, seq, deps, status)
/// inst!(instance_id, noop, deps, status)
///
/// Example:
/// ```
/// #[macro_use] extern crate epaxos;
/// use epaxos::types::*;
///
/// let inst = inst!((1, 2), "x", 3, [(1, 1), (2, 5)], Committed);
/// assert_eq!(InstanceStatus::Committed, inst.status);
/// assert_eq!("x", inst.dkey);
/// ```
#[macro_export]
#[allow(unused_macros)]
macro_rules! inst {
    ($id:expr, noop, [$(($rid:expr, $idx:expr)),* $(,)*], $status:ident) => {
        {
            let iid = $crate::types::InstanceId::from($id);
            let blt = $crate::types::Ballot::default_of(0, iid.replica_id);
            $crate::types::Instance {
                instance_id: iid,
                cmd: $crate::types::Command::noop(),
                dkey: $crate::types::NOOP_DKEY.to_string(),
                seq: 0,
                deps: $crate::deps![$(($rid, $idx)),*],
                ballot: blt,
                highest_seen: blt,
                status: $crate::types::InstanceStatus::$status,
            }
        }
    };

    ($id:expr, $key:expr, $seq:expr, [$(($rid:expr, $idx:expr)),* $(,)*], $status:ident) => {
        {
            let iid = $crate::types::InstanceId::from($id);
            let blt = $crate::types::Ballot::default_of(0, iid.replica_id);
            $crate::types::Instance {
                instance_id: iid,
                cmd: $crate::types::Command::write(format!("{}={}", $key, iid)),
                dkey: $key.to_string(),
                seq: $seq,
                deps: $crate::deps![$(($rid, $idx)),*],
                ballot: blt,
                highest_seen: blt,
                status: $crate::types::InstanceStatus::$status,
            }
        }
    };
}
