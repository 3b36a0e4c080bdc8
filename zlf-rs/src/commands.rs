pub(crate) mod capture;
pub(crate) mod mpdu;
pub(crate) mod output;

pub(crate) use capture::{cmd_frames, cmd_records};
pub(crate) use mpdu::cmd_mpdu;
