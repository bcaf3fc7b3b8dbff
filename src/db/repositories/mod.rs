mod kv_items;
