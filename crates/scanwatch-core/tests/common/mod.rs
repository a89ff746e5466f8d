pub mod scan_server;
