pub mod http_message_channel;
