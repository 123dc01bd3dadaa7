mod test_topology_convergence;
