//! Native queue-manager constants.
//!
//! Values match the queue manager's published interface definitions.

// ============================================================================
// Completion and Reason Codes
// ============================================================================

pub const MQCC_FAILED: i32 = 2;

pub const MQRC_CONNECTION_BROKEN: i32 = 2009;
pub const MQRC_HCONN_ERROR: i32 = 2018;
pub const MQRC_HOBJ_ERROR: i32 = 2019;
pub const MQRC_NO_MSG_AVAILABLE: i32 = 2033;
pub const MQRC_NOT_OPEN_FOR_INPUT: i32 = 2037;
pub const MQRC_NOT_OPEN_FOR_OUTPUT: i32 = 2039;
pub const MQRC_Q_MGR_NAME_ERROR: i32 = 2058;
pub const MQRC_Q_MGR_NOT_AVAILABLE: i32 = 2059;
pub const MQRC_UNKNOWN_OBJECT_NAME: i32 = 2085;
pub const MQRC_RESOURCE_PROBLEM: i32 = 2102;
pub const MQRC_NO_EXTERNAL_PARTICIPANTS: i32 = 2121;
pub const MQRC_UOW_IN_PROGRESS: i32 = 2128;
pub const MQRC_OPEN_FAILED: i32 = 2137;
pub const MQRC_Q_MGR_QUIESCING: i32 = 2161;
pub const MQRC_Q_MGR_STOPPING: i32 = 2162;
pub const MQRC_UNEXPECTED_ERROR: i32 = 2195;
pub const MQRC_CONNECTION_QUIESCING: i32 = 2202;
pub const MQRC_CONNECTION_STOPPING: i32 = 2203;

// ============================================================================
// Open Options
// ============================================================================

pub const MQOO_INPUT_SHARED: i32 = 0x0000_0002;
pub const MQOO_OUTPUT: i32 = 0x0000_0010;
pub const MQOO_FAIL_IF_QUIESCING: i32 = 0x0000_2000;

// ============================================================================
// Put / Get Options
// ============================================================================

pub const MQPMO_SYNCPOINT: i32 = 0x0000_0002;
pub const MQPMO_NO_SYNCPOINT: i32 = 0x0000_0004;
pub const MQPMO_NEW_MSG_ID: i32 = 0x0000_0040;

pub const MQGMO_WAIT: i32 = 0x0000_0001;
pub const MQGMO_SYNCPOINT: i32 = 0x0000_0002;
pub const MQGMO_NO_SYNCPOINT: i32 = 0x0000_0004;

pub const MQMO_NONE: i32 = 0x0000_0000;
pub const MQMO_MATCH_CORREL_ID: i32 = 0x0000_0002;

/// Wait forever.
pub const MQWI_UNLIMITED: i32 = -1;

// ============================================================================
// Message Descriptor Values
// ============================================================================

pub const MQMD_VERSION_1: i32 = 1;
pub const MQMD_VERSION_2: i32 = 2;

pub const MQENC_INTEGER_NORMAL: i32 = 0x0000_0001;
pub const MQENC_DECIMAL_NORMAL: i32 = 0x0000_0010;
pub const MQENC_FLOAT_IEEE_NORMAL: i32 = 0x0000_0100;
pub const MQENC_NATIVE: i32 = 0x0000_0111;

/// Blank format name; the body carries no format the queue manager understands.
pub const MQFMT_NONE: &str = "        ";

pub const MQMT_REQUEST: i32 = 1;
pub const MQMT_REPLY: i32 = 2;
pub const MQMT_DATAGRAM: i32 = 8;

pub const MQPER_NOT_PERSISTENT: i32 = 0;
pub const MQPER_PERSISTENT: i32 = 1;
pub const MQPER_PERSISTENCE_AS_Q_DEF: i32 = 2;

/// Use the queue manager's coded character set.
pub const MQCCSI_Q_MGR: i32 = 0;

pub const MQEI_UNLIMITED: i32 = -1;

/// Length of message and correlation identifiers.
pub const ID_LENGTH: usize = 24;

pub const MQMI_NONE: [u8; ID_LENGTH] = [0; ID_LENGTH];
pub const MQCI_NONE: [u8; ID_LENGTH] = [0; ID_LENGTH];
