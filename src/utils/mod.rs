pub mod acs_auth;
