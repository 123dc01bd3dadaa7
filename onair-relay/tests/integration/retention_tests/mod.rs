mod test_retention_margin;
