//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When test data changes (principals, catalog IDs, etc.),
//! update only this file.

// ============================================================================
// Test Principals
// ============================================================================

/// Principal subscribed to song 1 and to an item that no longer exists
pub const TEST_USER_EMAIL: &str = "testuser@example.com";

/// Principal with no subscriptions
pub const OTHER_USER_EMAIL: &str = "other@example.com";

// ============================================================================
// Test Catalog
// ============================================================================

pub const MUSIC_TABLE: &str = "music";
pub const SUBSCRIPTION_TABLE: &str = "subscribe";
pub const IMAGE_BUCKET: &str = "covers";

/// Artist of songs 1 and 2. Cover stored under the derived key `artistx.jpg`.
pub const ARTIST_X: &str = "Artist X";

/// Artist of song 3. The stored cover key points at a missing object.
pub const ARTIST_Y: &str = "Artist Y";

/// Artist of song 4. Cover stored under the explicit key `Artist_Z.jpg`.
pub const ARTIST_Z: &str = "Artist Z";

/// "Song A" by Artist X on "Album L" (2000)
pub const SONG_1_ID: &str = "m1";

/// "Song B" by Artist X on "Album M" (2001)
pub const SONG_2_ID: &str = "m2";

/// "Song C" by Artist Y on "Album L" (2000)
pub const SONG_3_ID: &str = "m3";

/// "Song A" by Artist Z on "Album N" (1999)
pub const SONG_4_ID: &str = "m4";

/// Referenced by a subscription row but absent from the catalog
pub const STALE_SONG_ID: &str = "m-gone";

pub const SONG_A_TITLE: &str = "Song A";
pub const ALBUM_L: &str = "Album L";

/// Raw bytes of the Artist X cover
pub const ARTIST_X_COVER: &[u8] = b"cover-of-artist-x";

/// Raw bytes of the Artist Z cover
pub const ARTIST_Z_COVER: &[u8] = b"cover-of-artist-z";

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for the server to become ready
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Polling interval while waiting for the server
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// Per-request timeout of the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
