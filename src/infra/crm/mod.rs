pub mod http_lead_store;
